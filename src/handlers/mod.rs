// Route tiers:
// v1 answers errors in plain text, v2 answers errors in the negotiated format.
pub mod system;
pub mod v1;
pub mod v2;
