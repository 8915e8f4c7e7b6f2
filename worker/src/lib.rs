pub mod event_replay;
