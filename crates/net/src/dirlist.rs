//! Turn a raw FTP directory listing into a minimal HTML page, one anchor
//! per file so the rendered listing is navigable.

/// One parsed long-format row, `-rw-r--r-- 1 user group 1024 Jan 01 12:00 name`.
struct LongRow<'a> {
    size: u64,
    name: &'a str,
    is_dir: bool,
}

fn parse_long_row(line: &str) -> Option<LongRow<'_>> {
    let mode_len = line
        .bytes()
        .take_while(|c| b"-rwxdls".contains(c))
        .count();
    if mode_len != 10 || line.as_bytes().get(10) != Some(&b' ') {
        return None;
    }

    let mut fields = line[10..].split_whitespace();
    let _nlinks = fields.next()?;
    let _user = fields.next()?;
    let _group = fields.next()?;
    let size: u64 = fields.next()?.parse().ok()?;
    let _month = fields.next()?;
    let _day = fields.next()?;

    // the name starts after the time field hh:mm, or after the year on
    // old entries
    let name = match line.find(':') {
        Some(i) => {
            let rest = &line[i + 1..];
            let j = rest
                .find(|c: char| !c.is_ascii_digit() && c != ':')
                .unwrap_or(rest.len());
            rest[j..].trim_start_matches(' ')
        }
        None => {
            let year = fields.next()?;
            let i = line.rfind(year)?;
            line[i + year.len()..].trim_start_matches(' ')
        }
    };
    if name.is_empty() {
        return None;
    }
    Some(LongRow {
        size,
        name,
        is_dir: line.starts_with('d'),
    })
}

fn escape_into(out: &mut String, line: &str) {
    for c in line.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

fn listing_line(out: &mut String, line: &str) {
    let line = line.strip_suffix('\r').unwrap_or(line);

    // blank lines and "total N" summaries become paragraph breaks
    if line.is_empty()
        || (line.len() > 6
            && line.as_bytes()[..6].eq_ignore_ascii_case(b"total ")
            && line[6..].trim().parse::<u64>().is_ok())
    {
        out.push_str("<P>\n");
        return;
    }
    out.push_str("<br>");

    if let Some(row) = parse_long_row(line) {
        // a symlink shows its own name but links to the target side
        let href = match row.name.split_once(" -> ") {
            Some((n, _)) => n,
            None => row.name,
        };
        let qc = if href.contains('"') { '\'' } else { '"' };
        out.push_str("<A HREF=");
        out.push(qc);
        out.push_str(href);
        out.push(qc);
        out.push('>');
        out.push_str(row.name);
        out.push_str("</A>");
        if row.is_dir {
            out.push('/');
        }
        out.push_str(": ");
        out.push_str(&row.size.to_string());
        out.push('\n');
        return;
    }

    escape_into(out, line);
    out.push('\n');
}

/// Reformat a line-oriented listing as an HTML document.
pub fn listing_to_html(listing: &str) -> String {
    let mut out = String::from("<html>\n<body>\n");
    if listing.is_empty() {
        out.push_str("this ftp directory is empty\n");
    } else {
        for line in listing.lines() {
            listing_line(&mut out, line);
        }
    }
    out.push_str("</body></html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_line_is_a_paragraph_break() {
        let html = listing_to_html("total 12\n");
        assert!(html.contains("<P>\n"));
        assert!(!html.contains("total 12"));
    }

    #[test]
    fn long_row_becomes_an_anchor_with_size() {
        let html = listing_to_html("-rw-r--r-- 1 user group 1024 Jan 01 12:00 file.txt\n");
        assert!(html.contains("<br><A HREF=\"file.txt\">file.txt</A>: 1024\n"));
    }

    #[test]
    fn directories_get_a_trailing_slash() {
        let html = listing_to_html("drwxr-xr-x 2 user group 4096 Jan 01 12:00 pub\n");
        assert!(html.contains(">pub</A>/: 4096"));
    }

    #[test]
    fn symlinks_link_by_their_own_name() {
        let html =
            listing_to_html("lrwxrwxrwx 1 user group 7 Jan 01 12:00 latest -> v2/file\n");
        assert!(html.contains("<A HREF=\"latest\">latest -> v2/file</A>"));
    }

    #[test]
    fn old_rows_with_a_year_still_parse() {
        let html = listing_to_html("-rw-r--r-- 1 user group 512 Jan 01 1998 olddata\n");
        assert!(html.contains(">olddata</A>: 512"));
    }

    #[test]
    fn multibyte_lines_shorter_than_the_total_prefix_pass_through() {
        // six bytes in, this line sits inside a multibyte char
        let html = listing_to_html("aaaaaé text\n");
        assert!(html.contains("<br>aaaaaé text\n"));
    }

    #[test]
    fn other_lines_are_escaped_text() {
        let html = listing_to_html("220 welcome <here> & gone\n");
        assert!(html.contains("<br>220 welcome &lt;here&gt; &amp; gone\n"));
    }

    #[test]
    fn empty_listing_says_so() {
        let html = listing_to_html("");
        assert!(html.contains("empty"));
    }
}
