//! Referer header 归一化
//!
//! 统计管道只关心来源 host：缺失归 "Direct"，给了但解析不出 host
//! 的归 "Other"，避免把任意脏字符串当维度值写进汇总表。

use url::Url;

use crate::analytics::{REFERRER_DIRECT, REFERRER_OTHER};

/// 从 Referer header 提取来源 host
pub fn referrer_host(referrer: Option<&str>) -> String {
    let Some(raw) = referrer else {
        return REFERRER_DIRECT.to_string();
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return REFERRER_DIRECT.to_string();
    }

    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_string(),
            None => REFERRER_OTHER.to_string(),
        },
        Err(_) => REFERRER_OTHER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_referrer_is_direct() {
        assert_eq!(referrer_host(None), "Direct");
        assert_eq!(referrer_host(Some("")), "Direct");
        assert_eq!(referrer_host(Some("   ")), "Direct");
    }

    #[test]
    fn test_host_extraction() {
        assert_eq!(
            referrer_host(Some("https://google.com/search?q=x")),
            "google.com"
        );
        assert_eq!(
            referrer_host(Some("http://news.ycombinator.com")),
            "news.ycombinator.com"
        );
        assert_eq!(
            referrer_host(Some("https://example.com:8443/path")),
            "example.com"
        );
    }

    #[test]
    fn test_unparsable_referrer_is_other() {
        assert_eq!(referrer_host(Some("not a url")), "Other");
        assert_eq!(referrer_host(Some("/relative/path")), "Other");
        // 无 host 的合法 URL 也归 Other
        assert_eq!(referrer_host(Some("mailto:user@example.com")), "Other");
    }
}
