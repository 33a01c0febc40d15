pub mod ai;
pub mod commands;
pub mod config;
pub mod events;
pub mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    /// `None` when no Gemini key is configured.
    pub ai_queue: Option<ai::AiQueue>,
    /// Restricts mention handling to one channel.
    pub ai_channel_id: Option<u64>,
}
