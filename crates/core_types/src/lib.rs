pub type FrameId = u64;
pub type JobId = u64;
