//! Live age counter, life-in-weeks grid and the personal documents around it
//! (profiles, goals, milestones, journal, bucket list).

pub mod backend;

pub use backend::Backend;
