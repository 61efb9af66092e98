pub mod deadline;
pub mod git_binary;
pub mod github;
pub mod prune;
pub mod roster;
