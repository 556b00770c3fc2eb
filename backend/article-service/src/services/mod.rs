pub mod policy;
pub mod ranking;

pub use policy::{RankingPolicy, VoteWeighting};
pub use ranking::RankingService;
