use shared::{Bill, VoteTally, VoteType};

/// Render the voting page for a bill.
///
/// `stale` marks pages rebuilt from the in-memory snapshot while the
/// database is unreachable; votes are disabled on those.
pub fn render_bill_page(bill: &Bill, tally: &VoteTally, stale: bool) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "  <title>TeenCivics - {}</title>\n",
        escape_html(&bill.title)
    ));
    html.push_str("  <style>\n");
    html.push_str("    body { font-family: Arial, sans-serif; max-width: 700px; margin: 40px auto; padding: 0 20px; line-height: 1.6; }\n");
    html.push_str("    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }\n");
    html.push_str("    .overview { font-size: 1.1em; color: #34495e; }\n");
    html.push_str("    .metadata { color: #7f8c8d; font-size: 0.9em; margin: 5px 0; }\n");
    html.push_str("    .stale { background-color: #fdf2d0; border: 1px solid #e0c060; padding: 10px; border-radius: 4px; }\n");
    html.push_str("    ul { margin: 10px 0; padding-left: 20px; }\n");
    html.push_str("    li { margin: 8px 0; }\n");
    html.push_str("    .vote-row button { font-size: 1em; padding: 10px 24px; margin-right: 10px; cursor: pointer; }\n");
    html.push_str("    .tally { margin-top: 15px; color: #34495e; }\n");
    html.push_str("    .link { color: #3498db; text-decoration: none; }\n");
    html.push_str("  </style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<h1>TeenCivics</h1>\n");

    if stale {
        html.push_str(
            "<p class=\"stale\">We're having trouble reaching our database. \
             This is a saved copy of the page; voting is paused for a moment.</p>\n",
        );
    }

    html.push_str(&format!("<h2>{}</h2>\n", escape_html(&bill.title)));

    html.push_str("<div class=\"metadata\">\n");
    html.push_str(&format!(
        "  {} {} &middot; {}th Congress",
        escape_html(&bill.bill_type),
        bill.number,
        bill.congress
    ));
    if let Some(date) = &bill.latest_action_date {
        html.push_str(&format!(" &middot; Last action: {}", escape_html(date)));
    }
    html.push_str("\n</div>\n");

    if let Some(action) = &bill.latest_action {
        html.push_str(&format!(
            "<div class=\"metadata\">{}</div>\n",
            escape_html(action)
        ));
    }

    if let Some(overview) = &bill.summary_overview {
        html.push_str(&format!(
            "<p class=\"overview\">{}</p>\n",
            escape_html(overview)
        ));
    }

    if !bill.summary_points.is_empty() {
        html.push_str("<ul>\n");
        for point in &bill.summary_points {
            html.push_str(&format!("  <li>{}</li>\n", escape_html(point)));
        }
        html.push_str("</ul>\n");
    }

    html.push_str(&format!(
        "<p><a class=\"link\" href=\"{}\" target=\"_blank\">Read the full bill on congress.gov</a></p>\n",
        escape_html(&bill.source_url)
    ));

    html.push_str("<h3>Would you vote for this bill?</h3>\n");
    if stale {
        html.push_str("<p class=\"metadata\">Voting will be back shortly.</p>\n");
    } else {
        html.push_str("<div class=\"vote-row\">\n");
        for vote in [VoteType::Yes, VoteType::No, VoteType::Unsure] {
            html.push_str(&format!(
                "  <button onclick=\"castVote('{}')\">{}</button>\n",
                vote.as_str(),
                vote_label(vote)
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str(&format!(
        "<div class=\"tally\" id=\"tally\">{}</div>\n",
        tally_line(tally)
    ));

    if !stale {
        html.push_str("<script>\n");
        html.push_str(&format!(
            "  const billSlug = {};\n",
            serde_json_string(&bill.slug)
        ));
        html.push_str("  async function castVote(voteType) {\n");
        html.push_str("    const res = await fetch('/api/vote', {\n");
        html.push_str("      method: 'POST',\n");
        html.push_str("      headers: { 'Content-Type': 'application/json' },\n");
        html.push_str("      body: JSON.stringify({ slug: billSlug, vote_type: voteType })\n");
        html.push_str("    });\n");
        html.push_str("    if (res.ok) {\n");
        html.push_str("      const t = await res.json();\n");
        html.push_str("      document.getElementById('tally').textContent =\n");
        html.push_str("        `Yes: ${t.yes} | No: ${t.no} | Unsure: ${t.unsure}`;\n");
        html.push_str("    }\n");
        html.push_str("  }\n");
        html.push_str("</script>\n");
    }

    html.push_str("</body>\n</html>");
    html
}

/// Shown when the database has no posted bill yet.
pub fn render_empty_page() -> String {
    simple_page(
        "Nothing here yet",
        "We haven't posted a bill yet. Check back soon!",
    )
}

/// Shown when the database is down and no snapshot exists.
pub fn render_unavailable_page() -> String {
    simple_page(
        "Be right back",
        "TeenCivics is having a moment. We're on it - try again in a minute.",
    )
}

fn simple_page(heading: &str, message: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str("  <title>TeenCivics</title>\n");
    html.push_str("</head>\n<body style=\"font-family: Arial, sans-serif; text-align: center; margin-top: 80px;\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(heading)));
    html.push_str(&format!("<p>{}</p>\n", escape_html(message)));
    html.push_str("</body>\n</html>");
    html
}

fn vote_label(vote: VoteType) -> &'static str {
    match vote {
        VoteType::Yes => "Yes \u{1F44D}",
        VoteType::No => "No \u{1F44E}",
        VoteType::Unsure => "Unsure \u{1F914}",
    }
}

fn tally_line(tally: &VoteTally) -> String {
    if tally.total() == 0 {
        return "No votes yet - be the first!".to_string();
    }
    format!(
        "Yes: {} ({}%) | No: {} ({}%) | Unsure: {} ({}%)",
        tally.yes,
        tally.percent(VoteType::Yes),
        tally.no,
        tally.percent(VoteType::No),
        tally.unsure,
        tally.percent(VoteType::Unsure)
    )
}

/// JSON string literal, so the slug can be embedded in inline script safely.
fn serde_json_string(s: &str) -> String {
    let mut out = String::from("\"");
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '<' => out.push_str("\\u003c"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_bill() -> Bill {
        Bill {
            id: 1,
            slug: "hr-3076-119".to_string(),
            congress: 119,
            bill_type: "HR".to_string(),
            number: 3076,
            title: "Postal Service Reform Act".to_string(),
            latest_action: Some("Passed the House.".to_string()),
            latest_action_date: Some("2026-08-20".to_string()),
            source_url: "https://www.congress.gov/bill/119th-congress/house-bill/3076"
                .to_string(),
            summary_overview: Some("Fixes how mail works.".to_string()),
            summary_points: vec!["Point one".to_string(), "Point <two>".to_string()],
            tweeted: true,
            tweet_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_contains_bill_content() {
        let tally = VoteTally {
            yes: 3,
            no: 1,
            unsure: 0,
        };
        let html = render_bill_page(&sample_bill(), &tally, false);

        assert!(html.contains("Postal Service Reform Act"));
        assert!(html.contains("Fixes how mail works."));
        assert!(html.contains("Point one"));
        assert!(html.contains("Yes: 3 (75%)"));
        assert!(html.contains("castVote"));
    }

    #[test]
    fn test_render_escapes_summary_points() {
        let html = render_bill_page(&sample_bill(), &VoteTally::default(), false);
        assert!(html.contains("Point &lt;two&gt;"));
        assert!(!html.contains("Point <two>"));
    }

    #[test]
    fn test_stale_page_disables_voting() {
        let html = render_bill_page(&sample_bill(), &VoteTally::default(), true);
        assert!(html.contains("saved copy"));
        assert!(!html.contains("castVote"));
    }

    #[test]
    fn test_fresh_page_has_no_stale_banner() {
        let html = render_bill_page(&sample_bill(), &VoteTally::default(), false);
        assert!(!html.contains("saved copy"));
    }

    #[test]
    fn test_empty_tally_prompt() {
        let html = render_bill_page(&sample_bill(), &VoteTally::default(), false);
        assert!(html.contains("No votes yet"));
    }

    #[test]
    fn test_unavailable_page() {
        let html = render_unavailable_page();
        assert!(html.contains("Be right back"));
    }

    #[test]
    fn test_json_string_escapes_script_breakers() {
        assert_eq!(serde_json_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(serde_json_string("</script>"), "\"\\u003c/script>\"");
    }
}
