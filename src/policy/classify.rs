//! Deterministic inquiry classification.
//!
//! Derives the attributes the policy branches on — location interest, age
//! signal, prior experience, blob coverage — from the inquiry text with
//! compiled regexes. No completion call is involved, so the selection rules
//! stay testable without a generator.

use regex::Regex;
use tracing::debug;

/// Students at or below this age get the readiness checklist.
pub const CHECKLIST_MAX_AGE: u8 = 4;

/// Where the inquirer wants lessons to happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationInterest {
    /// In-home service area.
    Irvine,
    /// A named place outside the in-home area.
    Other(String),
    /// No location mentioned.
    Unspecified,
}

/// Explicit age signal extracted from the inquiry.
///
/// Ages are only taken from unambiguous phrasings ("is 3", "6 year old").
/// Durations ("took piano for 2 years") never count as an age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeSignal {
    /// At or below [`CHECKLIST_MAX_AGE`].
    Young(u8),
    /// Above the checklist threshold.
    SchoolAge(u8),
    /// No explicit age in the text.
    Unspecified,
}

/// Whether the canonical blob fully answers the inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCoverage {
    /// Every detected topic is inside the blob's coverage set — reply with
    /// the blob near-verbatim.
    Full,
    /// Something asked falls outside the blob — compose from the extended
    /// fact set instead.
    Partial,
}

/// All policy-relevant attributes of one inquiry.
#[derive(Debug, Clone)]
pub struct PolicyContext {
    pub location: LocationInterest,
    pub age: AgeSignal,
    pub prior_experience: bool,
    pub coverage: TopicCoverage,
    /// Whether the inquiry asks about rates at all. Drives the clarifying
    /// question when no location was given.
    pub asks_about_pricing: bool,
}

/// Inquiry classifier with pre-compiled patterns.
pub struct InquiryClassifier {
    irvine: Regex,
    known_places: Vec<(Regex, String)>,
    resident_place: Regex,
    age_attached: Regex,
    age_stated: Regex,
    age_word: Regex,
    duration: Regex,
    experience: Vec<Regex>,
    pricing: Regex,
    uncovered_topics: Vec<(Regex, &'static str)>,
}

impl Default for InquiryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl InquiryClassifier {
    pub fn new() -> Self {
        // Places the school actually hears from; anything here that is not
        // Irvine routes to the studio price table.
        let places = [
            "Buena Park",
            "Cypress",
            "Anaheim",
            "Fullerton",
            "La Palma",
            "Cerritos",
            "Garden Grove",
            "Santa Ana",
            "Tustin",
            "Costa Mesa",
            "Long Beach",
            "Los Angeles",
        ];
        let known_places = places
            .iter()
            .map(|p| {
                let pattern = format!(r"(?i)\b{}\b", p.replace(' ', r"\s+"));
                (Regex::new(&pattern).unwrap(), (*p).to_string())
            })
            .collect();

        Self {
            irvine: Regex::new(r"(?i)\birvine\b").unwrap(),
            known_places,
            // "we live in Tustin", "we're located in Yorba Linda" — a
            // capitalized word after a residence phrase.
            resident_place: Regex::new(
                r"(?:live|living|located|based|reside)\s+in\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
            )
            .unwrap(),
            // "6 year old", "6-year-old", "3 years old"
            age_attached: Regex::new(r"(?i)\b(\d{1,2})[\s-]*years?[\s-]*old\b").unwrap(),
            // "she is 3", "he just turned 4", "my daughter turns 5"
            age_stated: Regex::new(
                r"(?i)\b(?:is|am|she's|he's|just turned|turned|turning|turns)\s+(\d{1,2})\b",
            )
            .unwrap(),
            // "three year old", "is four" — small word-number forms
            age_word: Regex::new(
                r"(?i)\b(?:is|turned|turning|turns)\s+(one|two|three|four|five|six|seven|eight|nine|ten)\b|\b(one|two|three|four|five|six|seven|eight|nine|ten)[\s-]*years?[\s-]*old\b",
            )
            .unwrap(),
            // Experience durations that must not be read as ages.
            duration: Regex::new(
                r"(?i)\b(?:for|of|about|over|nearly|almost)\s+\d{1,2}\s+years?\b|\b\d{1,2}\s+years?\s+(?:of|into)\b",
            )
            .unwrap(),
            experience: vec![
                Regex::new(r"(?i)\balready\s+(?:took|taken|taking|plays?|played|playing|studied|studying|had)\b").unwrap(),
                Regex::new(r"(?i)\b(?:has|have|had)\s+been\s+(?:playing|taking|studying|learning)\b").unwrap(),
                Regex::new(r"(?i)\b\d+\s+years?\s+of\s+(?:piano|lessons|music|experience)\b").unwrap(),
                Regex::new(r"(?i)\btook\s+(?:piano|lessons|classes)\b").unwrap(),
                Regex::new(r"(?i)\btransfer(?:ring)?\b").unwrap(),
                Regex::new(r"(?i)\bprior\s+experience\b").unwrap(),
                Regex::new(r"(?i)\bprevious\s+(?:teacher|instructor|lessons)\b").unwrap(),
                Regex::new(r"(?i)\bcurrent\s+teacher\b").unwrap(),
            ],
            pricing: Regex::new(r"(?i)\b(?:rates?|price|prices|pricing|cost|costs|fees?|tuition|charge|how much)\b").unwrap(),
            uncovered_topics: vec![
                (Regex::new(r"(?i)\b(?:violin|guitar|drums|voice|singing|flute|cello)\b").unwrap(), "other instrument"),
                (Regex::new(r"(?i)\b(?:recitals?|performances?|competitions?)\b").unwrap(), "recitals"),
                (Regex::new(r"(?i)\b(?:online|zoom|virtual|remote)\b").unwrap(), "online lessons"),
                (Regex::new(r"(?i)\b(?:make-?up|cancel|cancellation|reschedul)").unwrap(), "cancellation policy"),
                (Regex::new(r"(?i)\b(?:parking|drop-?off)\b").unwrap(), "logistics"),
                (Regex::new(r"(?i)\b(?:credentials?|degree|background|qualifications?)\b").unwrap(), "teacher background"),
                (Regex::new(r"(?i)\b(?:payment|pay|venmo|zelle|credit card|refund)\b").unwrap(), "payment"),
                (Regex::new(r"(?i)\b(?:adult|myself|for me\b)").unwrap(), "adult student"),
            ],
        }
    }

    /// Classify an inquiry body.
    pub fn classify(&self, body: &str) -> PolicyContext {
        let location = self.location_interest(body);
        let age = self.age_signal(body);
        let prior_experience = self.experience.iter().any(|r| r.is_match(body));
        let asks_about_pricing = self.pricing.is_match(body);

        // Anything the blob cannot answer forces the extended-facts path.
        // A returning student also leaves the blob path: its closing trial
        // offer must become an evaluation offer.
        let uncovered = self
            .uncovered_topics
            .iter()
            .find(|(r, _)| r.is_match(body));
        let coverage = if prior_experience || uncovered.is_some() {
            TopicCoverage::Partial
        } else {
            TopicCoverage::Full
        };

        if let Some((_, topic)) = uncovered {
            debug!(topic, "Inquiry reaches beyond the canonical blob");
        }

        PolicyContext {
            location,
            age,
            prior_experience,
            coverage,
            asks_about_pricing,
        }
    }

    fn location_interest(&self, body: &str) -> LocationInterest {
        if self.irvine.is_match(body) {
            return LocationInterest::Irvine;
        }
        for (regex, place) in &self.known_places {
            if regex.is_match(body) {
                return LocationInterest::Other(place.clone());
            }
        }
        if let Some(caps) = self.resident_place.captures(body)
            && let Some(place) = caps.get(1)
        {
            return LocationInterest::Other(place.as_str().to_string());
        }
        LocationInterest::Unspecified
    }

    fn age_signal(&self, body: &str) -> AgeSignal {
        // Spans that are experience durations, not ages.
        let duration_spans: Vec<(usize, usize)> = self
            .duration
            .find_iter(body)
            .map(|m| (m.start(), m.end()))
            .collect();
        let is_duration =
            |start: usize, end: usize| duration_spans.iter().any(|&(s, e)| start >= s && end <= e);

        let mut candidates: Vec<(usize, u8)> = Vec::new();

        for regex in [&self.age_attached, &self.age_stated] {
            for caps in regex.captures_iter(body) {
                if let Some(m) = caps.get(1)
                    && !is_duration(m.start(), m.end())
                    && let Ok(age) = m.as_str().parse::<u8>()
                    && age <= 18
                {
                    candidates.push((m.start(), age));
                }
            }
        }

        for caps in self.age_word.captures_iter(body) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2))
                && !is_duration(m.start(), m.end())
                && let Some(age) = word_to_age(m.as_str())
            {
                candidates.push((m.start(), age));
            }
        }

        // First explicit signal in reading order wins.
        candidates.sort_by_key(|&(pos, _)| pos);
        match candidates.first() {
            Some(&(_, age)) if age <= CHECKLIST_MAX_AGE => AgeSignal::Young(age),
            Some(&(_, age)) => AgeSignal::SchoolAge(age),
            None => AgeSignal::Unspecified,
        }
    }
}

fn word_to_age(word: &str) -> Option<u8> {
    let age = match word.to_ascii_lowercase().as_str() {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(age)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(body: &str) -> PolicyContext {
        InquiryClassifier::new().classify(body)
    }

    // ── Location ────────────────────────────────────────────────────

    #[test]
    fn detects_irvine() {
        let ctx = classify("We're in Irvine, our daughter is 3.");
        assert_eq!(ctx.location, LocationInterest::Irvine);
    }

    #[test]
    fn detects_known_place() {
        let ctx = classify("What are your Buena Park rates for a 6 year old?");
        assert_eq!(ctx.location, LocationInterest::Other("Buena Park".into()));
    }

    #[test]
    fn detects_residence_phrase() {
        let ctx = classify("We live in Yorba Linda, do you travel there?");
        assert_eq!(ctx.location, LocationInterest::Other("Yorba Linda".into()));
    }

    #[test]
    fn no_location_is_unspecified() {
        let ctx = classify("How much are piano lessons?");
        assert_eq!(ctx.location, LocationInterest::Unspecified);
    }

    #[test]
    fn irvine_wins_over_other_places() {
        let ctx = classify("We're moving from Anaheim to Irvine next month.");
        assert_eq!(ctx.location, LocationInterest::Irvine);
    }

    // ── Age ─────────────────────────────────────────────────────────

    #[test]
    fn age_from_year_old_phrase() {
        assert_eq!(
            classify("Lessons for my 6 year old?").age,
            AgeSignal::SchoolAge(6)
        );
        assert_eq!(
            classify("My 3-year-old loves music.").age,
            AgeSignal::Young(3)
        );
    }

    #[test]
    fn age_from_stated_phrase() {
        assert_eq!(
            classify("Our daughter is 3 and very curious.").age,
            AgeSignal::Young(3)
        );
        assert_eq!(classify("He just turned 4.").age, AgeSignal::Young(4));
    }

    #[test]
    fn age_from_word_number() {
        assert_eq!(
            classify("She is three years old.").age,
            AgeSignal::Young(3)
        );
    }

    #[test]
    fn boundary_four_is_young_five_is_not() {
        assert_eq!(classify("My son is 4.").age, AgeSignal::Young(4));
        assert_eq!(classify("My son is 5.").age, AgeSignal::SchoolAge(5));
    }

    #[test]
    fn no_age_is_unspecified() {
        assert_eq!(classify("Do you offer group lessons?").age, AgeSignal::Unspecified);
    }

    #[test]
    fn experience_duration_is_not_an_age() {
        let ctx = classify("My son already took piano for 2 years, can we enroll?");
        assert_eq!(ctx.age, AgeSignal::Unspecified);
        assert!(ctx.prior_experience);
    }

    #[test]
    fn duration_and_age_can_coexist() {
        let ctx = classify("She is 8 and has been playing for 2 years.");
        assert_eq!(ctx.age, AgeSignal::SchoolAge(8));
        assert!(ctx.prior_experience);
    }

    // ── Experience ──────────────────────────────────────────────────

    #[test]
    fn detects_prior_experience_phrases() {
        assert!(classify("He already plays a little.").prior_experience);
        assert!(classify("We are transferring from another school.").prior_experience);
        assert!(classify("She has 3 years of piano experience.").prior_experience);
        assert!(!classify("Complete beginner, never touched a piano.").prior_experience);
    }

    // ── Coverage ────────────────────────────────────────────────────

    #[test]
    fn plain_rate_inquiry_is_fully_covered() {
        let ctx = classify("What are your rates and do you do group lessons?");
        assert_eq!(ctx.coverage, TopicCoverage::Full);
        assert!(ctx.asks_about_pricing);
    }

    #[test]
    fn uncovered_topic_forces_extended_facts() {
        let ctx = classify("Do you hold recitals? And what are your rates?");
        assert_eq!(ctx.coverage, TopicCoverage::Partial);
    }

    #[test]
    fn prior_experience_forces_extended_facts() {
        let ctx = classify("My son already took piano for 2 years, can we enroll?");
        assert_eq!(ctx.coverage, TopicCoverage::Partial);
    }

    #[test]
    fn pricing_detection() {
        assert!(classify("How much do lessons cost?").asks_about_pricing);
        assert!(!classify("Is my daughter old enough to start?").asks_about_pricing);
    }
}
