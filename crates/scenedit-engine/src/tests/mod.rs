mod common;
mod editor_state;
mod schedule_fanout;
