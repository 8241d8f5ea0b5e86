use chrono::{DateTime, NaiveDateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PastRound;
use crate::error::{SdkError, SdkResult};

/// Pairs older than this many days count as new.
pub const HISTORY_BASELINE_DAYS: i64 = 300;

/// A past round with the weight a repeat of any of its pairs costs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRound {
    pub score: i64,
    pub pairs: Vec<Vec<String>>,
}

impl ScoredRound {
    /// Score `round` by how recently it was sent.
    pub fn from_past(round: &PastRound, now: DateTime<Utc>) -> SdkResult<Self> {
        Ok(ScoredRound {
            score: convert_date_to_score(&round.sent_at, now)?,
            pairs: round.pairs.clone(),
        })
    }
}

/// `HISTORY_BASELINE_DAYS` minus the whole days since `date`, never below 1.
pub fn convert_date_to_score(date: &str, now: DateTime<Utc>) -> SdkResult<i64> {
    let sent = DateTime::parse_from_rfc3339(date)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S").map(|d| d.and_utc())
        })
        .map_err(|e| SdkError::InvalidConfig(format!("invalid round date '{}': {}", date, e)))?;
    let days = (now - sent).num_days();
    Ok((HISTORY_BASELINE_DAYS - days).max(1))
}

/// Whether at least two members of `pair` were grouped together in `pairs`.
pub fn has_pair_in_pairs<S: AsRef<str>>(pair: &[S], pairs: &[Vec<String>]) -> bool {
    pairs.iter().any(|group| {
        pair.iter()
            .map(AsRef::<str>::as_ref)
            .filter(|email| group.iter().any(|g| g == *email))
            .count()
            >= 2
    })
}

/// Sum of round scores over every group that repeats a pairing from that round.
pub fn calculate_history_score(pairs: &[Vec<String>], history: &[ScoredRound]) -> i64 {
    pairs
        .iter()
        .flat_map(|pair| {
            history
                .iter()
                .filter(move |round| has_pair_in_pairs(pair.as_slice(), &round.pairs))
                .map(|round| round.score)
        })
        .sum()
}

fn shuffled_pairs<R: Rng + ?Sized>(emails: &[String], rng: &mut R) -> Vec<Vec<String>> {
    let mut pool = emails.to_vec();
    pool.shuffle(rng);

    let mut pairs = Vec::with_capacity(pool.len() / 2);
    while pool.len() >= 2 {
        let mut pair: Vec<String> = pool.drain(pool.len() - 2..).rev().collect();
        // An odd one out joins the last pair.
        if pool.len() == 1 {
            pair.extend(pool.pop());
        }
        pairs.push(pair);
    }
    pairs
}

/// Randomly group `emails` in pairs, with a trio when the count is odd.
///
/// `sample_count` shuffles are tried and the one with the lowest history
/// score wins (the first one on ties). Returns that score and the groups.
/// Fewer than two emails yields no groups.
pub fn pair_emails<R: Rng + ?Sized>(
    emails: &[String],
    history: &[ScoredRound],
    sample_count: usize,
    rng: &mut R,
) -> (i64, Vec<Vec<String>>) {
    if emails.len() < 2 {
        return (0, Vec::new());
    }

    let mut best: Option<(i64, Vec<Vec<String>>)> = None;
    for _ in 0..sample_count.max(1) {
        let pairs = shuffled_pairs(emails, rng);
        let score = calculate_history_score(&pairs, history);
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, pairs));
        }
    }
    best.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn emails(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn groups(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter().map(|g| emails(g)).collect()
    }

    fn history() -> Vec<ScoredRound> {
        vec![
            ScoredRound {
                score: 100,
                pairs: groups(&[
                    &["ex1@a.bc", "ex2@a.bc"],
                    &["ex3@a.bc", "ex4@a.bc"],
                    &["ex5@a.bc", "ex6@a.bc"],
                    &["ex7@a.bc", "ex8@a.bc"],
                    &["ex9@a.bc", "ex10@a.bc", "ex11@a.bc"],
                ]),
            },
            ScoredRound {
                score: 50,
                pairs: groups(&[
                    &["ex5@a.bc", "ex1@a.bc"],
                    &["ex6@a.bc", "ex2@a.bc"],
                    &["ex7@a.bc", "ex3@a.bc"],
                    &["ex8@a.bc", "ex4@a.bc"],
                    &["ex9@a.bc", "ex5@a.bc"],
                ]),
            },
        ]
    }

    #[test]
    fn test_pair_emails() {
        let roster: Vec<String> = (1..=9).map(|i| format!("ex{}@a.bc", i)).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let (score, pairs) = pair_emails(&roster, &[], 1000, &mut rng);
        assert_eq!(score, 0);
        let sizes: Vec<usize> = pairs.iter().map(Vec::len).collect();
        assert_eq!(sizes, [2, 2, 2, 3]);
        let mut seen: Vec<String> = pairs.concat();
        seen.sort();
        let mut expected = roster.clone();
        expected.sort();
        assert_eq!(seen, expected);

        assert_eq!(pair_emails(&[], &[], 1000, &mut rng), (0, Vec::new()));
        assert_eq!(pair_emails(&emails(&["a@b.com"]), &[], 1000, &mut rng), (0, Vec::new()));

        let recent = vec![ScoredRound {
            score: 100,
            pairs: groups(&[&["ex1@a.bc", "ex2@a.bc"], &["ex3@a.bc", "ex4@a.bc"]]),
        }];
        let (score, pairs) = pair_emails(&roster, &recent, 1000, &mut rng);
        assert_eq!(pairs.len(), 4);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_unavoidable_repeat_keeps_its_score() {
        let roster = emails(&["a@x.io", "b@x.io"]);
        let recent = vec![ScoredRound {
            score: 40,
            pairs: vec![roster.clone()],
        }];
        let mut rng = StdRng::seed_from_u64(1);
        let (score, pairs) = pair_emails(&roster, &recent, 5, &mut rng);
        assert_eq!(score, 40);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_calculate_history_score() {
        let history = history();
        let first = groups(&[
            &["ex1@a.bc", "ex3@a.bc"],
            &["ex2@a.bc", "ex4@a.bc"],
            &["ex11@a.bc", "ex9@a.bc"],
        ]);
        let second = groups(&[
            &["ex1@a.bc", "ex3@a.bc"],
            &["ex7@a.bc", "ex3@a.bc"],
            &["ex9@a.bc", "ex11@a.bc"],
        ]);
        let third = groups(&[
            &["ex1@a.bc", "ex3@a.bc"],
            &["ex2@a.bc", "ex4@a.bc"],
            &["ex3@a.bc", "ex5@a.bc"],
        ]);
        // The trio repeats a pair from both rounds.
        let fourth = groups(&[
            &["ex1@a.bc", "ex3@a.bc"],
            &["ex2@a.bc", "ex4@a.bc"],
            &["ex3@a.bc", "ex5@a.bc"],
            &["ex9@a.bc", "ex5@a.bc", "ex6@a.bc"],
        ]);

        assert_eq!(calculate_history_score(&first, &history), 100);
        assert_eq!(calculate_history_score(&second, &history), 150);
        assert_eq!(calculate_history_score(&third, &history), 0);
        assert_eq!(calculate_history_score(&fourth, &history), 150);
        assert_eq!(calculate_history_score(&fourth, &[]), 0);
    }

    #[test]
    fn test_has_pair_in_pairs() {
        let pairs = history().remove(0).pairs;

        assert!(has_pair_in_pairs(&["ex5@a.bc", "ex6@a.bc"], &pairs));
        assert!(!has_pair_in_pairs(&["ex5@a.bc", "ex2@a.bc"], &pairs));
        assert!(has_pair_in_pairs(&["ex5@a.bc", "ex6@a.bc", "ex7@a.bc"], &pairs));
        assert!(has_pair_in_pairs(&["ex9@a.bc", "ex11@a.bc"], &pairs));
    }

    #[test]
    fn test_convert_date_to_score() {
        let now = Utc.with_ymd_and_hms(2022, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(convert_date_to_score("2021-12-01T01:01:01", now).unwrap(), 300 - 31);
        assert_eq!(convert_date_to_score("2022-01-01T01:01:01", now).unwrap(), 300);
        assert_eq!(convert_date_to_score("2019-12-01T01:01:01", now).unwrap(), 1);
        assert_eq!(convert_date_to_score("2021-12-31T12:00:00Z", now).unwrap(), 299);
        assert!(convert_date_to_score("yesterday", now).is_err());
    }

    #[test]
    fn test_scored_round_from_past() {
        let now = Utc.with_ymd_and_hms(2022, 1, 1, 12, 0, 0).unwrap();
        let round = PastRound {
            sent_at: "2021-12-01T01:01:01".to_string(),
            pairs: groups(&[&["a@x.io", "b@x.io"]]),
        };
        let scored = ScoredRound::from_past(&round, now).unwrap();
        assert_eq!(scored.score, 269);
        assert_eq!(scored.pairs, round.pairs);
    }
}
