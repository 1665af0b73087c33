mod accounts;
mod articles;
mod schema;
mod subscribers;
mod templates;
mod types;

pub use schema::{Database, DEFAULT_BODY_TEMPLATE, DEFAULT_SUBJECT_TEMPLATE};
pub use types::{
    AccountRecord, Article, ArticleFields, DatabaseError, Role, SubscribeOutcome, Subscriber,
};
