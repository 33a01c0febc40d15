mod aiqueue;
mod ask;
mod help;
mod translate;
mod trivia;

use crate::{Data, Error};

pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help::help(),
        ask::ask(),
        ask::a(),
        translate::translate(),
        translate::tr(),
        trivia::trivia(),
        trivia::quiz(),
        aiqueue::aiqueue(),
    ]
}
