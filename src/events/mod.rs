use poise::serenity_prelude as serenity;

use crate::{Data, Error};

pub async fn handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        crate::ai::channel::handle(ctx, new_message, data).await?;
    }
    Ok(())
}
