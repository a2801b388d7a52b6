pub(crate) mod exam_timing;
pub(crate) mod lifecycle;
pub(crate) mod scoring;
