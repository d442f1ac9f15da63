// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};

use crate::domain::models::site::{Page, Site};
use crate::domain::models::version::Version;

/// 参与日期筛选的对象
///
/// 站点与页面以"最近变更时间"判断，版本以自身日期判断，未附带日期的对象直接放行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSubject {
    /// 裸时间戳
    Timestamp(DateTime<Utc>),
    /// 带自身日期的对象
    Dated(Option<DateTime<Utc>>),
    /// 带最近变更时间的对象
    LastChange(Option<DateTime<Utc>>),
}

impl From<&Site> for DateSubject {
    fn from(site: &Site) -> Self {
        DateSubject::LastChange(site.last_change_date)
    }
}

impl From<&Page> for DateSubject {
    fn from(page: &Page) -> Self {
        DateSubject::LastChange(page.last_change_date)
    }
}

impl From<&Version> for DateSubject {
    fn from(version: &Version) -> Self {
        DateSubject::Dated(Some(version.date))
    }
}

/// 日期区间 `[after, before)`
///
/// 两端均可缺省；端点的开闭可配置，默认下界闭、上界开
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub after_inclusive: bool,
    pub before_inclusive: bool,
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl DateRange {
    pub fn new(after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        Self {
            after,
            before,
            after_inclusive: true,
            before_inclusive: false,
        }
    }

    /// 不做任何限制
    pub fn unbounded() -> Self {
        Self::default()
    }

    fn contains_date(&self, date: DateTime<Utc>) -> bool {
        let after_ok = match self.after {
            Some(after) if self.after_inclusive => date >= after,
            Some(after) => date > after,
            None => true,
        };
        let before_ok = match self.before {
            Some(before) if self.before_inclusive => date <= before,
            Some(before) => date < before,
            None => true,
        };
        after_ok && before_ok
    }

    /// 判断对象是否落在区间内
    pub fn accepts(&self, subject: DateSubject) -> bool {
        match subject {
            DateSubject::Timestamp(date) => self.contains_date(date),
            DateSubject::Dated(Some(date)) | DateSubject::LastChange(Some(date)) => {
                self.contains_date(date)
            }
            DateSubject::Dated(None) | DateSubject::LastChange(None) => true,
        }
    }

    pub fn accepts_site(&self, site: &Site) -> bool {
        self.accepts(site.into())
    }

    pub fn accepts_page(&self, page: &Page) -> bool {
        self.accepts(page.into())
    }

    pub fn accepts_version(&self, version: &Version) -> bool {
        self.accepts(version.into())
    }
}
