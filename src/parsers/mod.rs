pub mod frame_parser;
