pub(crate) mod build;
pub(crate) mod run;
pub(crate) mod visualize;
