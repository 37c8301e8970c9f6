//! Reply constraints — the composer's real contract.
//!
//! Generation is delegated to a non-deterministic backend, so the guarantee
//! is not a fixed output but a constraint set the generated text must
//! satisfy. Constraints are derived from the [`PolicyContext`] and verified
//! against the reply before it is accepted.

use crate::policy::classify::{AgeSignal, LocationInterest, PolicyContext};
use crate::policy::{PolicyDocument, Salutation};

/// A phrase group that must appear in the reply. Satisfied when any one of
/// the needles is present (case-insensitive).
#[derive(Debug, Clone)]
pub struct RequiredPhrase {
    pub description: String,
    pub needles: Vec<String>,
}

/// A phrase that must never appear in the reply.
#[derive(Debug, Clone)]
pub struct ForbiddenPhrase {
    pub description: String,
    pub needle: String,
}

/// Everything a generated reply must and must not contain.
#[derive(Debug, Clone)]
pub struct ReplyConstraints {
    pub required: Vec<RequiredPhrase>,
    pub forbidden: Vec<ForbiddenPhrase>,
    /// Family name that must appear in a formal `Dear ...` opening, when the
    /// sender's name was available.
    pub salutation: Option<Salutation>,
    /// The reply's mandatory final lines.
    pub signoff: String,
}

impl ReplyConstraints {
    /// Derive the constraint set for one classified inquiry.
    pub fn for_context(
        policy: &PolicyDocument,
        ctx: &PolicyContext,
        salutation: Option<Salutation>,
    ) -> Self {
        let mut required = Vec::new();
        let mut forbidden = Vec::new();

        let require = |list: &mut Vec<RequiredPhrase>, description: &str, needles: &[&str]| {
            list.push(RequiredPhrase {
                description: description.to_string(),
                needles: needles.iter().map(|n| n.to_string()).collect(),
            });
        };
        let forbid = |list: &mut Vec<ForbiddenPhrase>, description: &str, needle: &str| {
            list.push(ForbiddenPhrase {
                description: description.to_string(),
                needle: needle.to_string(),
            });
        };

        match &ctx.location {
            LocationInterest::Irvine => {
                for figure in policy.in_home_rates.figures() {
                    require(&mut required, "in-home price point", &[figure]);
                }
                for figure in policy.studio_rates.figures() {
                    forbid(&mut forbidden, "Buena Park studio price point", figure);
                }
                // Irvine replies still direct everyone else to the studio.
                require(
                    &mut required,
                    "redirect of non-Irvine students to the studio",
                    &["Buena Park studio"],
                );
            }
            LocationInterest::Other(_) => {
                for figure in policy.studio_rates.figures() {
                    require(&mut required, "Buena Park studio price point", &[figure]);
                }
                for figure in policy.in_home_rates.figures() {
                    forbid(&mut forbidden, "in-home price point", figure);
                }
            }
            LocationInterest::Unspecified => {
                // Conservative default: no figures from either table until the
                // student's location is known.
                for figure in policy.studio_rates.figures() {
                    forbid(&mut forbidden, "price point without a known location", figure);
                }
                for figure in policy.in_home_rates.figures() {
                    forbid(&mut forbidden, "price point without a known location", figure);
                }
                if ctx.asks_about_pricing {
                    require(
                        &mut required,
                        "clarifying question about the student's location",
                        &["located", "location", "which area", "where you"],
                    );
                }
            }
        }

        let checklist_needles = [
            "count numbers up to 5",
            "letters A through G",
            "numbers up to 5 without assistance",
        ];
        match ctx.age {
            AgeSignal::Young(_) => {
                for needle in checklist_needles {
                    require(&mut required, "readiness checklist item", &[needle]);
                }
            }
            // The checklist is omitted entirely unless the age is an explicit
            // <= 4 signal.
            AgeSignal::SchoolAge(_) | AgeSignal::Unspecified => {
                for needle in checklist_needles {
                    forbid(&mut forbidden, "readiness checklist item", needle);
                }
            }
        }

        if ctx.prior_experience {
            require(
                &mut required,
                "free evaluation/consultation offer",
                &["free evaluation", "free consultation", "evaluation/consultation"],
            );
            forbid(&mut forbidden, "trial lesson offered to a returning student", "trial lesson");
        } else {
            match &ctx.location {
                LocationInterest::Irvine => require(
                    &mut required,
                    "free in-home trial lesson offer",
                    &["in-home trial"],
                ),
                LocationInterest::Other(_) | LocationInterest::Unspecified => require(
                    &mut required,
                    "free trial lesson offer",
                    &["free trial lesson"],
                ),
            }
        }

        Self {
            required,
            forbidden,
            salutation,
            signoff: policy.signoff.clone(),
        }
    }

    /// Verify a generated reply against this constraint set.
    ///
    /// Returns the first violation found, described well enough to diagnose
    /// from a log line.
    pub fn check(&self, reply: &str) -> Result<(), String> {
        let lower = reply.to_lowercase();

        for phrase in &self.required {
            let present = phrase
                .needles
                .iter()
                .any(|n| lower.contains(&n.to_lowercase()));
            if !present {
                return Err(format!("missing required content: {}", phrase.description));
            }
        }

        for phrase in &self.forbidden {
            if lower.contains(&phrase.needle.to_lowercase()) {
                return Err(format!(
                    "contains excluded content: {} ({:?})",
                    phrase.description, phrase.needle
                ));
            }
        }

        self.check_greeting(reply)?;
        self.check_signoff(reply)?;
        Ok(())
    }

    fn check_greeting(&self, reply: &str) -> Result<(), String> {
        let Some(salutation) = &self.salutation else {
            return Ok(());
        };
        let Some(first_line) = reply.lines().find(|l| !l.trim().is_empty()) else {
            return Err("reply is empty".to_string());
        };
        let line = first_line.trim();
        if !line.starts_with("Dear ") {
            return Err(format!("greeting is not formal: {line:?}"));
        }
        let has_honorific = ["Mr.", "Mrs.", "Ms."].iter().any(|h| line.contains(h));
        if !has_honorific || !line.contains(&salutation.last_name) {
            return Err(format!(
                "greeting does not address {} formally: {line:?}",
                salutation.last_name
            ));
        }
        Ok(())
    }

    fn check_signoff(&self, reply: &str) -> Result<(), String> {
        let trimmed = reply.trim_end();
        let expected: Vec<&str> = self.signoff.lines().collect();
        let tail: Vec<&str> = trimmed
            .lines()
            .rev()
            .take(expected.len())
            .map(str::trim)
            .collect();
        let matches = expected.len() == tail.len()
            && expected
                .iter()
                .rev()
                .zip(tail.iter())
                .all(|(want, got)| want.trim().eq_ignore_ascii_case(got));
        if matches {
            Ok(())
        } else {
            Err(format!(
                "reply does not end with the sign-off {:?}",
                self.signoff
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::classify::TopicCoverage;

    fn ctx(location: LocationInterest, age: AgeSignal, experienced: bool) -> PolicyContext {
        PolicyContext {
            location,
            age,
            prior_experience: experienced,
            coverage: TopicCoverage::Partial,
            asks_about_pricing: true,
        }
    }

    fn constraints(location: LocationInterest, age: AgeSignal, experienced: bool) -> ReplyConstraints {
        let policy = PolicyDocument::standard();
        ReplyConstraints::for_context(&policy, &ctx(location, age, experienced), None)
    }

    fn signoff() -> String {
        "Best Regards,\nMerit Academy of Music".to_string()
    }

    // ── Location filter ─────────────────────────────────────────────

    #[test]
    fn irvine_requires_in_home_figures_and_forbids_studio_figures() {
        let c = constraints(LocationInterest::Irvine, AgeSignal::Unspecified, false);

        let good = format!(
            "Dear family,\n\nIn-home lessons in Irvine run $40 for 30 minutes, $60 for 45 minutes, and $80 for 60 minutes. \
             For all other students, lessons take place at our Buena Park studio. \
             We'd be glad to schedule a free in-home trial lesson.\n\n{}",
            signoff()
        );
        assert!(c.check(&good).is_ok());

        let leaks_studio_price = good.replace("$40", "$35");
        assert!(c.check(&leaks_studio_price).is_err());
    }

    #[test]
    fn other_location_requires_studio_figures_and_forbids_in_home_figures() {
        let c = constraints(
            LocationInterest::Other("Buena Park".into()),
            AgeSignal::SchoolAge(6),
            false,
        );

        let good = format!(
            "Hello,\n\nOur Buena Park studio rates are $35 for 30 minutes, $52.50 for 45 minutes, and $70 for 60 minutes. \
             You are welcome to a free trial lesson at the studio.\n\n{}",
            signoff()
        );
        assert!(c.check(&good).is_ok());

        let with_in_home = good.replace("$35", "$35 (or $40 in-home)");
        let err = c.check(&with_in_home).unwrap_err();
        assert!(err.contains("in-home price point"), "{err}");
    }

    #[test]
    fn unspecified_location_forbids_all_figures_and_asks_for_location() {
        let c = constraints(LocationInterest::Unspecified, AgeSignal::Unspecified, false);

        let good = format!(
            "Hello,\n\nCould you let us know where you are located so we can share the right rates? \
             We'd also be happy to set up a free trial lesson.\n\n{}",
            signoff()
        );
        assert!(c.check(&good).is_ok());

        let with_price = good.replace("right rates?", "right rates? Our sessions start at $35.");
        assert!(c.check(&with_price).is_err());

        let no_question = good.replace("where you are located", "more about your goals");
        let err = c.check(&no_question).unwrap_err();
        assert!(err.contains("location"), "{err}");
    }

    // ── Age filter ──────────────────────────────────────────────────

    #[test]
    fn young_age_requires_all_checklist_items() {
        let c = constraints(LocationInterest::Irvine, AgeSignal::Young(3), false);
        let missing_one = format!(
            "Dear parent,\n\nIn-home rates are $40, $60, and $80. Other students visit our Buena Park studio. \
             Before starting we suggest checking that your child can count numbers up to 5 independently \
             and recognize alphabet letters A through G. \
             We'd love to schedule a free in-home trial lesson.\n\n{}",
            signoff()
        );
        let err = c.check(&missing_one).unwrap_err();
        assert!(err.contains("checklist"), "{err}");

        let complete = missing_one.replace(
            "letters A through G.",
            "letters A through G, and write their name and numbers up to 5 without assistance.",
        );
        assert!(c.check(&complete).is_ok());
    }

    #[test]
    fn checklist_is_forbidden_for_older_and_unspecified_ages() {
        for age in [AgeSignal::SchoolAge(6), AgeSignal::Unspecified] {
            let c = constraints(LocationInterest::Other("Cypress".into()), age, false);
            let reply = format!(
                "Hello,\n\nStudio rates are $35, $52.50, and $70. \
                 We recommend your child can count numbers up to 5 independently. \
                 Come by for a free trial lesson.\n\n{}",
                signoff()
            );
            let err = c.check(&reply).unwrap_err();
            assert!(err.contains("checklist"), "{err}");
        }
    }

    // ── Trial vs evaluation ─────────────────────────────────────────

    #[test]
    fn experienced_student_gets_evaluation_not_trial() {
        let c = constraints(LocationInterest::Unspecified, AgeSignal::Unspecified, true);

        let trial_reply = format!(
            "Hello,\n\nCould you tell us where you are located? We'd be happy to offer a free trial lesson.\n\n{}",
            signoff()
        );
        assert!(c.check(&trial_reply).is_err());

        let evaluation_reply = format!(
            "Hello,\n\nCould you tell us where you are located? Since your son has prior experience, \
             we'd like to offer a free evaluation to understand his current level and discuss goals.\n\n{}",
            signoff()
        );
        assert!(c.check(&evaluation_reply).is_ok());
    }

    // ── Greeting & sign-off frames ──────────────────────────────────

    #[test]
    fn salutation_requires_formal_dear_line() {
        let policy = PolicyDocument::standard();
        let c = ReplyConstraints::for_context(
            &policy,
            &ctx(LocationInterest::Unspecified, AgeSignal::Unspecified, false),
            Salutation::from_display_name(Some("Jane Nguyen")),
        );

        let informal = format!(
            "Hey Jane!\n\nWhere are you located? We'd love to offer a free trial lesson.\n\n{}",
            signoff()
        );
        assert!(c.check(&informal).is_err());

        let formal = format!(
            "Dear Ms. Nguyen,\n\nCould you let us know where you are located? \
             We'd be happy to arrange a free trial lesson.\n\n{}",
            signoff()
        );
        assert!(c.check(&formal).is_ok());
    }

    #[test]
    fn signoff_must_be_final_content() {
        let c = constraints(LocationInterest::Unspecified, AgeSignal::Unspecified, false);
        let trailing_text = format!(
            "Hello,\n\nWhere are you located? A free trial lesson awaits.\n\n{}\n\nP.S. see you soon!",
            signoff()
        );
        assert!(c.check(&trailing_text).is_err());
    }

    #[test]
    fn scenario_buena_park_six_year_old() {
        // "What are your Buena Park rates for a 6 year old?"
        let c = constraints(
            LocationInterest::Other("Buena Park".into()),
            AgeSignal::SchoolAge(6),
            false,
        );
        let reply = format!(
            "Dear parent,\n\nOur Buena Park studio rates are $35 for a 30-minute session, \
             $52.50 for 45 minutes, and $70 for 60 minutes. Sessions are one-on-one, once a week. \
             We'd be happy to schedule a free trial lesson at the studio.\n\n{}",
            signoff()
        );
        assert!(c.check(&reply).is_ok());
        for excluded in ["$40", "$60", "$80", "count numbers up to 5"] {
            assert!(
                !reply.to_lowercase().contains(&excluded.to_lowercase()),
                "scenario reply must not contain {excluded}"
            );
        }
    }

    #[test]
    fn scenario_irvine_three_year_old() {
        // "We're in Irvine, our daughter is 3."
        let c = constraints(LocationInterest::Irvine, AgeSignal::Young(3), false);
        let reply = format!(
            "Dear parent,\n\nWe offer in-home lessons in Irvine: $40 for 30 minutes, $60 for 45 minutes, \
             and $80 for 60 minutes. For all other students, lessons take place at our Buena Park studio. \
             To see whether she's ready, check that she can count numbers up to 5 independently, \
             recognize alphabet letters A through G, and write her name and numbers up to 5 without assistance. \
             We'd love to schedule a free in-home trial lesson.\n\n{}",
            signoff()
        );
        assert!(c.check(&reply).is_ok());
    }
}
