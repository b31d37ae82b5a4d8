pub(crate) mod ease;
pub(crate) mod frames;
pub(crate) mod kind;
pub(crate) mod plan;
