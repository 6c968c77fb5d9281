pub mod daily_click_rollup;
pub mod daily_geo_rollup;
pub mod daily_referrer_rollup;
pub mod short_link;

pub use daily_click_rollup::Entity as DailyClickRollupEntity;
pub use daily_geo_rollup::Entity as DailyGeoRollupEntity;
pub use daily_referrer_rollup::Entity as DailyReferrerRollupEntity;
pub use short_link::Entity as ShortLinkEntity;
