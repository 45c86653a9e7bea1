// crates/xornet-client/src/components/mod.rs

pub mod help;
pub mod machine_details;
pub mod machine_table;
pub mod status_bar;
