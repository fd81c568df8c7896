/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use log::debug;

use ftpwalk_proto::FtpLineDataReceiver;

use crate::{Entry, EntryKind, ListTime};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn parse_month(s: &str) -> Option<u32> {
    if s.len() != 3 {
        return None;
    }
    let s = s.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == s).map(|i| i as u32 + 1)
}

/// Byte spans of the whitespace separated fields.
fn field_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::with_capacity(10);
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, line.len()));
    }
    spans
}

fn parse_time(month: u32, day: &str, year_or_time: &str, today: NaiveDate) -> Option<ListTime> {
    let day = u32::from_str(day).ok()?;
    if let Some((h, m)) = year_or_time.split_once(':') {
        let time = NaiveTime::from_hms_opt(u32::from_str(h).ok()?, u32::from_str(m).ok()?, 0)?;
        // no year in the listing, so it's within the last 6 months
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
        let date = match this_year {
            Some(d) if d <= today.checked_add_days(Days::new(1))? => d,
            _ => NaiveDate::from_ymd_opt(today.year() - 1, month, day)?,
        };
        Some(ListTime::DateTime(date.and_time(time)))
    } else {
        let year = i32::from_str(year_or_time).ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(ListTime::Date)
    }
}

/// Parse one unix style LIST line, like
/// `drwxr-xr-x    2 ftp      ftp          4096 Mar 01  2018 092018`.
///
/// The group column is optional. `None` is returned for lines that do not
/// describe a valid entry, including the `total` line and `.`/`..`.
pub fn parse_list_line(line: &str, today: NaiveDate) -> Option<Entry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let spans = field_spans(line);
    let field = |i: usize| spans.get(i).map(|(s, e)| &line[*s..*e]);

    let perm = field(0)?;
    let type_hint = match perm.as_bytes()[0] {
        b'd' => Some(EntryKind::Directory),
        b'-' => Some(EntryKind::File),
        b'l' | b'b' | b'c' | b'p' | b's' => None,
        _ => return None,
    };

    // with and without the group column
    for month_index in [5, 4] {
        let Some(month) = field(month_index).and_then(parse_month) else {
            continue;
        };
        let Some(size) = field(month_index - 1).and_then(|s| u64::from_str(s).ok()) else {
            continue;
        };
        let (Some(day), Some(yt)) = (field(month_index + 1), field(month_index + 2)) else {
            continue;
        };
        let Some(modified) = parse_time(month, day, yt, today) else {
            continue;
        };
        let Some((name_start, _)) = spans.get(month_index + 3) else {
            continue;
        };

        let mut name = &line[*name_start..];
        if perm.starts_with('l') {
            if let Some((link, _target)) = name.split_once(" -> ") {
                name = link;
            }
        }

        let entry = match Entry::new(name, size, Some(modified)) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skip list entry {name}: {e}");
                return None;
            }
        };
        return Some(match type_hint {
            Some(kind) => entry.with_type_hint(kind),
            None => entry,
        });
    }

    None
}

/// Collect entries from LIST data lines, malformed lines are skipped.
pub(crate) struct ListingReceiver {
    today: NaiveDate,
    entries: Vec<Entry>,
    skipped: usize,
}

impl ListingReceiver {
    pub(crate) fn new(today: NaiveDate) -> Self {
        ListingReceiver {
            today,
            entries: Vec::new(),
            skipped: 0,
        }
    }

    #[inline]
    pub(crate) fn skipped(&self) -> usize {
        self.skipped
    }

    pub(crate) fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

#[async_trait]
impl FtpLineDataReceiver for ListingReceiver {
    async fn recv_line(&mut self, line: &str) {
        match parse_list_line(line, self.today) {
            Some(entry) => self.entries.push(entry),
            None => {
                let line = line.trim_end();
                if !line.is_empty() && !line.starts_with("total ") {
                    debug!("skip unrecognized list line: {line}");
                    self.skipped += 1;
                }
            }
        }
    }

    fn should_return_early(&self) -> bool {
        false
    }

    fn skip_invalid_line(&mut self, line_no: usize) {
        debug!("skip invalid list line {line_no}");
        self.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn directory_with_year() {
        let e = parse_list_line(
            "drwxr-xr-x    2 ftp      ftp          4096 Mar 01  2018 092018\r\n",
            today(),
        )
        .unwrap();
        assert_eq!(e.name(), "092018");
        assert_eq!(e.size(), 4096);
        assert_eq!(e.type_hint(), Some(EntryKind::Directory));
        assert_eq!(
            e.modified(),
            Some(&ListTime::Date(NaiveDate::from_ymd_opt(2018, 3, 1).unwrap()))
        );
    }

    #[test]
    fn file_with_time() {
        let e = parse_list_line(
            "-rw-r--r--    1 ftp      ftp      10 Feb 20 10:20 a.txt",
            today(),
        )
        .unwrap();
        assert_eq!(e.name(), "a.txt");
        assert_eq!(e.size(), 10);
        assert_eq!(e.type_hint(), Some(EntryKind::File));
        assert_eq!(e.modified().unwrap().to_string(), "2024-02-20 10:20");

        // a date after today is in the previous year
        let e = parse_list_line(
            "-rw-r--r--    1 ftp      ftp      10 Nov 02 08:00 b.txt",
            today(),
        )
        .unwrap();
        assert_eq!(e.modified().unwrap().to_string(), "2023-11-02 08:00");
    }

    #[test]
    fn name_with_spaces() {
        let e = parse_list_line(
            "-rw-r--r--    1 ftp      ftp      5 Jan 01  2020 my report.tar.gz",
            today(),
        )
        .unwrap();
        assert_eq!(e.name(), "my report.tar.gz");
    }

    #[test]
    fn no_group_column() {
        let e = parse_list_line("-rw-r--r-- 1 owner 1234 Dec 31 2019 data.csv", today()).unwrap();
        assert_eq!(e.name(), "data.csv");
        assert_eq!(e.size(), 1234);
    }

    #[test]
    fn symlink() {
        let e = parse_list_line(
            "lrwxrwxrwx    1 ftp      ftp             7 Jan 01  2020 latest -> v1.2.3",
            today(),
        )
        .unwrap();
        assert_eq!(e.name(), "latest");
        assert_eq!(e.type_hint(), None);
    }

    #[test]
    fn skip_invalid() {
        assert!(parse_list_line("total 24", today()).is_none());
        assert!(parse_list_line("", today()).is_none());
        assert!(
            parse_list_line(
                "drwxr-xr-x    2 ftp      ftp          4096 Mar 01  2018 .",
                today()
            )
            .is_none()
        );
        assert!(
            parse_list_line(
                "drwxr-xr-x    2 ftp      ftp          4096 Mar 01  2018 ..",
                today()
            )
            .is_none()
        );
        assert!(
            parse_list_line(
                "-rw-r--r--    1 ftp      ftp          abc Mar 01  2018 x",
                today()
            )
            .is_none()
        );
        assert!(
            parse_list_line(
                "-rw-r--r--    1 ftp      ftp          10 Mar 01  2018",
                today()
            )
            .is_none()
        );
    }

    #[tokio::test]
    async fn receiver_skips_bad_lines() {
        let mut receiver = ListingReceiver::new(today());
        receiver.recv_line("total 8\r\n").await;
        receiver
            .recv_line("-rw-r--r--    1 ftp ftp 10 Mar 01  2018 a.txt\r\n")
            .await;
        receiver.recv_line("garbage line\r\n").await;
        receiver
            .recv_line("drwxr-xr-x    2 ftp ftp 4096 Mar 01  2018 sub\r\n")
            .await;
        assert_eq!(receiver.skipped(), 1);
        let entries = receiver.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name(), "sub");
    }
}
