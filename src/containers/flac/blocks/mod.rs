pub mod application;
pub mod cue_sheet;
pub mod picture;
pub mod seek_table;
pub mod stream_info;
