//! HTTP date cracking. Two RFC-822-family layouts and asctime:
//!
//! `Mon, 03 Jan 2000 21:29:33 GMT|[+-]nnnn`
//! `Sunday, 06-Nov-94 08:49:37 GMT`
//! `Sun Nov  6 08:49:37 1994`
//!
//! Malformed input yields `None`, never a panic.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

struct Cursor<'a> {
    s: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Cursor { s: s.as_bytes() }
    }

    fn peek(&self) -> u8 {
        self.s.first().copied().unwrap_or(0)
    }

    fn bump(&mut self) {
        if !self.s.is_empty() {
            self.s = &self.s[1..];
        }
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == c {
            self.bump();
            true
        } else {
            false
        }
    }

    fn digit(&mut self) -> Option<u32> {
        let c = self.peek();
        if c.is_ascii_digit() {
            self.bump();
            Some((c - b'0') as u32)
        } else {
            None
        }
    }

    fn two_digits(&mut self) -> Option<u32> {
        Some(self.digit()? * 10 + self.digit()?)
    }

    fn four_digits(&mut self) -> Option<u32> {
        Some(self.two_digits()? * 100 + self.two_digits()?)
    }

    fn month(&mut self) -> Option<u32> {
        if self.s.len() < 3 {
            return None;
        }
        let m = MONTHS
            .iter()
            .position(|name| self.s[..3].eq_ignore_ascii_case(name.as_bytes()))?;
        self.s = &self.s[3..];
        Some(m as u32)
    }
}

/// Parse an HTTP header date into an absolute instant.
pub fn parse_header_date(date: &str) -> Option<SystemTime> {
    // skip past the day of the week
    let (_, rest) = date.split_once(' ')?;
    let mut c = Cursor::new(rest);

    let year;
    let month;
    let mday;
    let asctime;

    if c.peek().is_ascii_digit() {
        // day month year first, time after
        asctime = false;
        let mut d = c.digit()?;
        if let Some(d2) = c.digit() {
            d = d * 10 + d2;
        }
        mday = d;
        if !c.eat(b' ') && !c.eat(b'-') {
            return None;
        }
        month = c.month()?;
        if c.eat(b' ') {
            year = c.four_digits()?;
        } else if c.eat(b'-') {
            // Sunday, 06-Nov-94 08:49:37 GMT
            let y1 = c.digit()?;
            let y2 = c.digit()?;
            if c.peek().is_ascii_digit() {
                year = (y1 * 10 + y2) * 100 + c.two_digits()?;
            } else {
                year = if y1 >= 7 { 1900 } else { 2000 } + y1 * 10 + y2;
            }
        } else {
            return None;
        }
        if !c.eat(b' ') {
            return None;
        }
    } else {
        // asctime: month day time year
        asctime = true;
        month = c.month()?;
        while c.eat(b' ') {}
        let mut d = c.digit()?;
        if c.peek() != b' ' {
            d = d * 10 + c.digit()?;
        }
        mday = d;
        if !c.eat(b' ') {
            return None;
        }
        year = 0;
    }

    let hour = c.two_digits()?;
    if !c.eat(b':') {
        return None;
    }
    let min = c.two_digits()?;
    if !c.eat(b':') {
        return None;
    }
    let sec = c.two_digits()?;

    let year = if asctime {
        if !c.eat(b' ') {
            return None;
        }
        c.four_digits()?
    } else {
        year
    };

    if c.peek() != b' ' && c.peek() != 0 {
        return None;
    }
    while c.eat(b' ') {}

    // numeric zone offset, in seconds to subtract
    let mut zone: i64 = 0;
    let sign = c.peek();
    if (sign == b'+' || sign == b'-') && c.s.len() >= 5 {
        c.bump();
        if let (Some(zh), Some(zm)) = (c.two_digits(), c.two_digits()) {
            zone = (zh as i64 * 60 + zm as i64) * 60;
            if sign == b'+' {
                zone = -zone;
            }
        }
    }

    let t = civil_to_unix(year as i64, month, mday, hour, min, sec)?;
    let t = t + zone;
    if t < 0 {
        return None;
    }
    Some(UNIX_EPOCH + Duration::from_secs(t as u64))
}

/// Days-from-civil plus the time of day, all in UTC.
fn civil_to_unix(year: i64, month: u32, mday: u32, hour: u32, min: u32, sec: u32) -> Option<i64> {
    if month > 11 || mday == 0 || mday > 31 || hour > 23 || min > 59 || sec > 60 {
        return None;
    }
    let m = month as i64 + 1;
    let y = if m <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + mday as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    let days = era * 146097 + doe - 719468;
    Some(days * 86400 + hour as i64 * 3600 + min as i64 * 60 + sec as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(date: &str) -> Option<u64> {
        parse_header_date(date)
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
    }

    #[test]
    fn rfc822_format() {
        assert_eq!(epoch("Sat, 03 Jan 2015 21:29:33 GMT"), Some(1420320573));
    }

    #[test]
    fn asctime_format() {
        assert_eq!(epoch("Fri Nov  6 08:49:37 1994"), Some(784111777));
    }

    #[test]
    fn two_digit_years() {
        assert_eq!(
            epoch("Sunday, 06-Nov-94 08:49:37 GMT"),
            epoch("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn numeric_zone_offsets() {
        let base = epoch("Sat, 03 Jan 2015 21:29:33 GMT").unwrap();
        assert_eq!(epoch("Sat, 03 Jan 2015 21:29:33 +0100"), Some(base - 3600));
        assert_eq!(epoch("Sat, 03 Jan 2015 21:29:33 -0230"), Some(base + 9000));
    }

    #[test]
    fn malformed_dates_return_none() {
        for bad in [
            "",
            "nonsense",
            "Sat, 99 Jan 2015 21:29:33 GMT",
            "Sat, 03 Jan 2015 21:29 GMT",
            "Sat, 03 Xxx 2015 21:29:33 GMT",
            "Sat, 03 Jan 2015 2x:29:33 GMT",
            "Fri Nov  6 08:49:37",
        ] {
            assert_eq!(epoch(bad), None, "{bad}");
        }
    }
}
