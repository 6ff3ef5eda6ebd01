pub mod machine_output;
pub mod paths;
pub mod remote;
pub mod sanitize;
pub mod text;
