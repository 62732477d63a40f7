mod actions;
pub(crate) mod args;

pub(crate) use actions::{build_options, handle_request, handle_whoami, parse_pair};
