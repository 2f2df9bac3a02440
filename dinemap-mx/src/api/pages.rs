//! Reviewer-facing HTML pages
//!
//! These render inside whatever the reviewer's mail client opens, so
//! they are self-contained: inline CSS, no scripts, no static assets.
//!
//! Every rejected link gets the same generic page regardless of which
//! check failed; distinct messages would let someone probing forged
//! tokens tell a bad signature from a bad field.

use axum::response::Html;
use dinemap_common::db::models::{ExpansionCity, ReviewStatus, ReviewVote, VoteChoice};

/// Escape text destined for HTML bodies or attributes
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Shared page shell in the DineMap house style
fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>DineMap - {title}</title>
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background: #1a1a1a;
            color: #e0e0e0;
        }}
        header {{
            background-color: #2a2a2a;
            border-bottom: 1px solid #3a3a3a;
            padding: 20px;
            margin-bottom: 30px;
        }}
        h1 {{
            font-size: 26px;
            color: #4a9eff;
            max-width: 720px;
            margin: 0 auto;
        }}
        .content {{
            max-width: 720px;
            margin: 0 auto;
            padding: 20px;
        }}
        .card {{
            background: #2a2a2a;
            border: 1px solid #3a3a3a;
            border-radius: 8px;
            padding: 30px;
            text-align: center;
        }}
        h2 {{
            color: #4a9eff;
            margin-bottom: 20px;
        }}
        p {{
            margin-bottom: 12px;
        }}
        .mark {{
            font-size: 48px;
            margin-bottom: 20px;
        }}
        .mark-ok {{ color: #4ade80; }}
        .mark-bad {{ color: #ef4444; }}
        .banner {{
            border-radius: 6px;
            padding: 12px;
            margin: 20px 0;
            font-weight: 600;
        }}
        .banner-green {{ background: #10b981; color: #fff; }}
        .banner-amber {{ background: #f59e0b; color: #fff; }}
        .banner-red {{ background: #ef4444; color: #fff; }}
        .banner-gray {{ background: #3a3a3a; color: #e0e0e0; }}
        .tally {{
            list-style: none;
            margin: 20px 0;
        }}
        .tally li {{
            padding: 6px 0;
            border-bottom: 1px solid #3a3a3a;
        }}
        .muted {{ color: #888; }}
        .button {{
            display: inline-block;
            padding: 12px 24px;
            background: #4a9eff;
            color: white;
            text-decoration: none;
            border-radius: 4px;
            margin-top: 10px;
            font-weight: 600;
        }}
        .button:hover {{ background: #3a8eef; }}
    </style>
</head>
<body>
    <header>
        <h1>DineMap Market Expansion</h1>
    </header>
    <div class="content">
        <div class="card">
{body}
        </div>
    </div>
</body>
</html>
"#
    ))
}

/// The one page every rejected link gets (400)
pub fn invalid_link_page() -> Html<String> {
    page(
        "Invalid Review Link",
        r#"            <div class="mark mark-bad">&#10007;</div>
            <h2>Invalid Review Link</h2>
            <p>This review link is not valid. It may have been truncated by
            your mail client, or it may have been altered.</p>
            <p class="muted">Please open the link exactly as it appears in
            your review request email.</p>"#,
    )
}

/// Authentic link, but the city has been removed from tracking (200)
pub fn city_gone_page() -> Html<String> {
    page(
        "City No Longer Tracked",
        r#"            <div class="mark muted">&#8212;</div>
            <h2>City No Longer Tracked</h2>
            <p>This city is no longer under consideration, so there is
            nothing left to vote on.</p>
            <p class="muted">No action is needed on your part.</p>"#,
    )
}

/// Vote could not be stored; the link itself is fine (200)
pub fn vote_failed_page() -> Html<String> {
    page(
        "Vote Not Recorded",
        r#"            <div class="mark mark-bad">&#10007;</div>
            <h2>Vote Not Recorded</h2>
            <p>Something went wrong while recording your vote. Nothing was
            saved.</p>
            <p class="muted">Please try the link again in a few minutes.</p>"#,
    )
}

/// Confirmation page after a stored vote (200)
///
/// Lists every current vote by reviewer so the clicker sees where the
/// team stands, plus a banner once the votes amount to a decision.
pub fn vote_recorded_page(
    city: &ExpansionCity,
    choice: VoteChoice,
    votes: &[ReviewVote],
    status: ReviewStatus,
    admin_base_url: &str,
) -> Html<String> {
    let city_name = escape_html(&city.display_name());

    let tally_items: String = votes
        .iter()
        .map(|vote| {
            let who = vote
                .reviewer_name
                .as_deref()
                .unwrap_or(&vote.reviewer_email);
            let choice_label = vote.choice().map(|c| c.label()).unwrap_or("Unknown");
            format!(
                "            <li>{}: {}</li>\n",
                escape_html(who),
                choice_label
            )
        })
        .collect();

    let (banner_class, banner_text) = status_banner(status);

    let body = format!(
        r#"            <div class="mark mark-ok">&#10003;</div>
            <h2>Vote Recorded</h2>
            <p>Your vote: <strong>{choice}</strong></p>
            <p>Recorded for <strong>{city_name}</strong>.</p>
            <ul class="tally">
{tally_items}            </ul>
            <div class="banner {banner_class}">{banner_text}</div>
            <p class="muted">Changed your mind? Use another link from the
            same email; your latest vote replaces the earlier one.</p>
            <a href="{admin_base_url}/cities/{guid}" class="button">Open in Expansion Dashboard</a>"#,
        choice = choice.label(),
        guid = city.guid,
    );

    page("Vote Recorded", &body)
}

fn status_banner(status: ReviewStatus) -> (&'static str, &'static str) {
    match status {
        ReviewStatus::NoVotes => ("banner-gray", "No reviewer votes recorded yet."),
        ReviewStatus::Pending => ("banner-gray", "Waiting on the rest of the review team."),
        ReviewStatus::ConsensusInterested => {
            ("banner-green", "The review team agrees: pursue this market.")
        }
        ReviewStatus::ConsensusNotNow => {
            ("banner-amber", "The review team agrees: revisit this market later.")
        }
        ReviewStatus::ConsensusReject => {
            ("banner-red", "The review team agrees: pass on this market.")
        }
        ReviewStatus::SplitDecision => {
            ("banner-amber", "The review team is split; flagged for discussion.")
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_city() -> ExpansionCity {
        ExpansionCity {
            guid: uuid::Uuid::parse_str("a1b2c3d4-e5f6-4a0b-8c1d-2e3f4a5b6c7d").unwrap(),
            name: "Hershey".to_string(),
            state: "PA".to_string(),
            sub_scores: None,
            market_potential_score: 0,
            restaurant_estimate: None,
            restaurant_validated: None,
            bar_estimate: None,
            bar_validated: None,
            priority: 5,
            review_status: "pending".to_string(),
            research_summary: None,
            research_notes: None,
            researched_at: None,
            created_at: "2025-01-01 00:00:00".to_string(),
            updated_at: "2025-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"O'Fallon" & Sons</b>"#),
            "&lt;b&gt;&quot;O&#39;Fallon&quot; &amp; Sons&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_invalid_link_page_is_generic() {
        let html = invalid_link_page().0;
        assert!(html.contains("Invalid Review Link"));

        // Nothing in the page may hint at WHICH check failed
        for needle in ["token", "signature", "parameter", "expired"] {
            assert!(
                !html.to_lowercase().contains(needle),
                "failure page leaks '{}'",
                needle
            );
        }
    }

    #[test]
    fn test_vote_recorded_page_contents() {
        let city = sample_city();
        let votes = vec![ReviewVote {
            city_id: city.guid.to_string(),
            reviewer_email: "alice@x.com".to_string(),
            reviewer_name: Some("Alice".to_string()),
            vote: "interested".to_string(),
            voted_at: "2025-01-02 00:00:00".to_string(),
        }];

        let html = vote_recorded_page(
            &city,
            VoteChoice::Interested,
            &votes,
            ReviewStatus::Pending,
            "http://localhost:5841",
        )
        .0;

        assert!(html.contains("Hershey, PA"));
        assert!(html.contains("Your vote: <strong>Interested</strong>"));
        assert!(html.contains("Alice: Interested"));
        assert!(html.contains("Waiting on the rest of the review team."));
        assert!(html.contains(&format!("http://localhost:5841/cities/{}", city.guid)));
    }

    #[test]
    fn test_tally_lists_every_reviewer() {
        let city = sample_city();
        let votes = vec![
            ReviewVote {
                city_id: city.guid.to_string(),
                reviewer_email: "alice@x.com".to_string(),
                reviewer_name: Some("Alice".to_string()),
                vote: "not_now".to_string(),
                voted_at: "2025-01-02 00:00:00".to_string(),
            },
            ReviewVote {
                city_id: city.guid.to_string(),
                reviewer_email: "bob@x.com".to_string(),
                reviewer_name: None,
                vote: "reject".to_string(),
                voted_at: "2025-01-02 00:01:00".to_string(),
            },
        ];

        let html = vote_recorded_page(
            &city,
            VoteChoice::NotNow,
            &votes,
            ReviewStatus::SplitDecision,
            "http://localhost:5841",
        )
        .0;

        assert!(html.contains("Your vote: <strong>Not Now</strong>"));
        assert!(html.contains("Alice: Not Now"));
        // Falls back to the email when no display name is on file
        assert!(html.contains("bob@x.com: Reject"));
    }

    #[test]
    fn test_city_name_is_escaped() {
        let mut city = sample_city();
        city.name = "<script>alert(1)</script>".to_string();

        let html = vote_recorded_page(
            &city,
            VoteChoice::Reject,
            &[],
            ReviewStatus::Pending,
            "http://localhost:5841",
        )
        .0;

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_consensus_banners() {
        let city = sample_city();

        let html = vote_recorded_page(
            &city,
            VoteChoice::Interested,
            &[],
            ReviewStatus::ConsensusInterested,
            "http://localhost:5841",
        )
        .0;
        assert!(html.contains("pursue this market"));

        let html = vote_recorded_page(
            &city,
            VoteChoice::Reject,
            &[],
            ReviewStatus::SplitDecision,
            "http://localhost:5841",
        )
        .0;
        assert!(html.contains("split"));
    }
}
