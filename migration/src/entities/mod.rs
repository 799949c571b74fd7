pub mod daily_aggregate;
pub mod event;
pub mod job_cursor;
pub mod promo_code;

pub use daily_aggregate::Entity as DailyAggregateEntity;
pub use event::Entity as EventEntity;
pub use job_cursor::Entity as JobCursorEntity;
pub use promo_code::Entity as PromoCodeEntity;
