//! Reply-composition policy.
//!
//! The policy decides what a generated reply is required to contain and what
//! it must never contain, given attributes of the inbound inquiry. Flow:
//!
//! 1. `classify` derives a [`PolicyContext`] from the inquiry text (location
//!    interest, age signal, prior experience, blob coverage) — deterministic,
//!    no LLM involved.
//! 2. `constraints` turns the context into a machine-checkable
//!    [`ReplyConstraints`] set.
//! 3. `prompt` renders the completion instruction, exposing only the facts
//!    the reply is permitted to use.

pub mod classify;
pub mod constraints;
pub mod prompt;

pub use classify::{AgeSignal, InquiryClassifier, LocationInterest, PolicyContext, TopicCoverage};
pub use constraints::ReplyConstraints;

/// Categories a policy fact belongs to. Facts are filtered by tag before the
/// model ever sees them, so excluded pricing never reaches the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactTag {
    /// Always available.
    General,
    /// Buena Park studio price table.
    StudioRates,
    /// In-home (Irvine) price table.
    InHomeRates,
    /// Readiness checklist and the not-ready recommendation.
    Readiness,
    /// Free trial lesson offer (new students).
    TrialOffer,
    /// Free evaluation/consultation offer (students with prior experience).
    EvaluationOffer,
}

/// One fact from the extended fallback set.
#[derive(Debug, Clone)]
pub struct PolicyFact {
    pub text: String,
    pub tag: FactTag,
}

/// A price table for one lesson location.
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub thirty_min: String,
    pub forty_five_min: String,
    pub sixty_min: String,
}

impl PriceTable {
    /// The three price figures, as they must appear in a reply.
    pub fn figures(&self) -> [&str; 3] {
        [&self.thirty_min, &self.forty_five_min, &self.sixty_min]
    }
}

/// Static reply policy: the canonical answer blob, the extended fact set,
/// the price tables and readiness checklist as addressable pieces, and the
/// fixed greeting/sign-off frames.
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    pub school_name: String,
    /// Canonical text answering the most common inquiry, reproduced
    /// near-verbatim when it fully covers the question.
    pub blob: String,
    /// Ordered fallback facts for inquiries the blob does not fully answer.
    pub extended_facts: Vec<PolicyFact>,
    pub studio_rates: PriceTable,
    pub in_home_rates: PriceTable,
    pub readiness_checklist: [String; 3],
    /// Two-line closing; always the final content of a reply.
    pub signoff: String,
}

impl PolicyDocument {
    /// The school's standing policy.
    pub fn standard() -> Self {
        let school_name = "Merit Academy of Music".to_string();
        Self {
            blob: BLOB.trim().to_string(),
            extended_facts: standard_facts(),
            studio_rates: PriceTable {
                thirty_min: "$35".into(),
                forty_five_min: "$52.50".into(),
                sixty_min: "$70".into(),
            },
            in_home_rates: PriceTable {
                thirty_min: "$40".into(),
                forty_five_min: "$60".into(),
                sixty_min: "$80".into(),
            },
            readiness_checklist: [
                "Can count numbers up to 5 independently".into(),
                "Can recognize alphabet letters A through G".into(),
                "Can write their name and numbers up to 5 without assistance".into(),
            ],
            signoff: format!("Best Regards,\n{school_name}"),
            school_name,
        }
    }

    /// The canonical blob with the sections a context excludes elided.
    ///
    /// Rule 1 permits only minimal contextual edits on the blob path, while
    /// the location and age filters still apply. Those edits are performed
    /// here, deterministically, so the generator never sees an excluded
    /// price table or an out-of-place checklist.
    pub fn blob_for(&self, ctx: &PolicyContext) -> String {
        let keep_studio_rates = matches!(ctx.location, LocationInterest::Other(_));
        let keep_in_home_rates = matches!(ctx.location, LocationInterest::Irvine);
        let keep_readiness = matches!(ctx.age, AgeSignal::Young(_));

        #[derive(PartialEq)]
        enum Section {
            Body,
            StudioRates,
            InHomeRates,
            Readiness,
        }

        let mut section = Section::Body;
        let mut lines = Vec::new();
        for line in self.blob.lines() {
            if line.starts_with("Our Buena Park studio rates") {
                section = Section::StudioRates;
            } else if line.starts_with("For In-home lessons") {
                section = Section::InHomeRates;
            } else if line.starts_with("To help determine") {
                section = Section::Readiness;
            } else if section == Section::Readiness {
                // The readiness section runs through its closing advice line.
                if line.starts_with("If they aren't quite ready") {
                    if keep_readiness {
                        lines.push(line);
                    }
                    section = Section::Body;
                    continue;
                }
            } else if line.trim().is_empty() || !line.starts_with('-') {
                // Rate blocks end at the first blank or non-item line.
                section = Section::Body;
            }

            let keep = match section {
                Section::Body => true,
                Section::StudioRates => keep_studio_rates,
                Section::InHomeRates => keep_in_home_rates,
                Section::Readiness => keep_readiness,
            };
            if keep {
                lines.push(line);
            }
        }

        let mut text = lines.join("\n");
        // Collapse blank runs left by elided sections.
        while text.contains("\n\n\n") {
            text = text.replace("\n\n\n", "\n\n");
        }
        if matches!(ctx.location, LocationInterest::Irvine) {
            text = text.replace(
                "a free trial lesson at our Buena Park studio",
                "a free in-home trial lesson",
            );
        }
        text
    }

    /// Facts permitted for the given context, in policy order.
    pub fn facts_for(&self, ctx: &PolicyContext) -> Vec<&PolicyFact> {
        self.extended_facts
            .iter()
            .filter(|fact| match fact.tag {
                FactTag::General => true,
                FactTag::StudioRates => matches!(ctx.location, LocationInterest::Other(_)),
                FactTag::InHomeRates => matches!(ctx.location, LocationInterest::Irvine),
                FactTag::Readiness => matches!(ctx.age, AgeSignal::Young(_)),
                FactTag::TrialOffer => !ctx.prior_experience,
                FactTag::EvaluationOffer => ctx.prior_experience,
            })
            .collect()
    }
}

/// Formal salutation synthesized from the sender's display name.
///
/// Only the family name is derivable from an address header; the honorific
/// itself is left to the generator within the `Mr./Mrs./Ms.` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salutation {
    pub last_name: String,
}

impl Salutation {
    /// Derive a salutation from an optional display name.
    ///
    /// Returns `None` when there is no usable name (bare address, empty
    /// string) — the reply then opens with a generic formal greeting.
    pub fn from_display_name(name: Option<&str>) -> Option<Self> {
        let name = name?.trim();
        if name.is_empty() || name.contains('@') {
            return None;
        }
        let last = name
            .split_whitespace()
            .last()?
            .trim_matches(|c: char| !c.is_alphabetic());
        if last.is_empty() {
            return None;
        }
        let mut chars = last.chars();
        let first = chars.next()?;
        Some(Self {
            last_name: first.to_uppercase().collect::<String>() + chars.as_str(),
        })
    }
}

const BLOB: &str = r#"
All of our lessons are one-on-one, allowing each student to receive personalized instruction tailored to their individual needs. We do not offer group lessons, and sessions are typically held once a week.

Currently, we offer in-home lessons for students located in Irvine. For all other students, lessons take place at our Buena Park studio, located just in front of Cypress Community College.
Our Buena Park studio rates are as follows:
- 30-minute session: $35
- 45-minute session: $52.50
- 60-minute session: $70
For In-home lessons, the rates are as follows:
- 30-minute session: $40
- 45-minute session: $60
- 60-minute session: $80

The ideal lesson length is usually recommended after a trial lesson and can vary based on the student's age and prior experience. For young beginners, we often suggest starting with 30-minute lessons to assess comfort level and focus. Lesson durations can always be adjusted over time.
To help determine if your child is ready for the program, we recommend checking the following:

- Can count numbers up to 5 independently
- Can recognize alphabet letters A through G
- Can write their name and numbers up to 5 without assistance

If they aren't quite ready yet, we suggest encouraging them to listen to music regularly to help develop their sense of rhythm and interest in music.
Please let us know if you'd like more information or if you'd like to schedule a free trial lesson at our Buena Park studio.
"#;

fn standard_facts() -> Vec<PolicyFact> {
    let fact = |text: &str, tag| PolicyFact {
        text: text.to_string(),
        tag,
    };
    vec![
        fact(
            "All lessons are one-on-one and held weekly. No group lessons.",
            FactTag::General,
        ),
        fact(
            "In-home lessons are available only in Irvine. All other students come to the Buena Park studio near Cypress Community College.",
            FactTag::General,
        ),
        fact(
            "Buena Park studio rates: $35 (30min), $52.50 (45min), $70 (60min).",
            FactTag::StudioRates,
        ),
        fact(
            "In-home rates (Irvine only): $40 (30min), $60 (45min), $80 (60min).",
            FactTag::InHomeRates,
        ),
        fact(
            "Trial lessons help determine the appropriate lesson length based on age and experience. Young beginners usually start with 30 minutes.",
            FactTag::General,
        ),
        fact(
            "Readiness checklist: can count numbers up to 5 independently, can recognize alphabet letters A through G, and can write their name and numbers up to 5 without assistance.",
            FactTag::Readiness,
        ),
        fact(
            "If the child is not ready yet, recommend listening to music often to build rhythm and interest.",
            FactTag::Readiness,
        ),
        fact(
            "A free trial lesson is available (at the Buena Park studio, or in-home for Irvine students).",
            FactTag::TrialOffer,
        ),
        fact(
            "Students with prior experience are offered a free evaluation/consultation, to understand their current level and discuss goals.",
            FactTag::EvaluationOffer,
        ),
    ]
}
