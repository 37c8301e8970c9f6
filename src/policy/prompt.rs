//! Renders the completion instruction for one classified inquiry.
//!
//! The instruction is scoped: only the facts the reply is permitted to use
//! are included, so the generator never sees an excluded price table or an
//! out-of-policy offer. The constraint checker remains the backstop.

use std::fmt::Write;

use crate::policy::classify::{AgeSignal, LocationInterest, PolicyContext, TopicCoverage};
use crate::policy::{PolicyDocument, Salutation};

/// Build the system instruction for the completion backend.
pub fn instruction(
    policy: &PolicyDocument,
    ctx: &PolicyContext,
    salutation: Option<&Salutation>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are the email assistant for {}, a classical piano school. \
         Write a reply to the inquiry below, following every rule exactly.",
        policy.school_name
    );
    out.push('\n');

    match ctx.coverage {
        TopicCoverage::Full => {
            out.push_str(
                "The inquiry is answered by the school's canonical text below. Reproduce it \
                 near-verbatim as the reply body, making only minimal contextual edits \
                 (pronouns, the recipient's name). Introduce no information that is not in \
                 this text.\n\n",
            );
            out.push_str("--- canonical text ---\n");
            out.push_str(&policy.blob_for(ctx));
            out.push_str("\n--- end canonical text ---\n");
        }
        TopicCoverage::Partial => {
            out.push_str(
                "Answer using only the facts below. Stay consistent with every fact; \
                 do not contradict any of them or introduce information beyond them.\n\n",
            );
            for fact in policy.facts_for(ctx) {
                let _ = writeln!(out, "- {}", fact.text);
            }
        }
    }

    out.push_str("\nRules:\n");

    match salutation {
        Some(s) => {
            let _ = writeln!(
                out,
                "- Open with the formal salutation \"Dear Mr./Mrs./Ms. {}\"; pick the \
                 honorific that fits, never a first name.",
                s.last_name
            );
        }
        None => out.push_str(
            "- Open with a formal greeting; the sender's name is unknown, so do not invent one.\n",
        ),
    }

    match &ctx.location {
        LocationInterest::Irvine => out.push_str(
            "- The student is in Irvine: quote only the in-home rates. Do not mention any \
             Buena Park studio price. Keep the sentence directing all other students to the \
             Buena Park studio.\n",
        ),
        LocationInterest::Other(place) => {
            let _ = writeln!(
                out,
                "- The student is in {place}: quote only the Buena Park studio rates. \
                 Do not mention in-home rates or in-home availability pricing."
            );
        }
        LocationInterest::Unspecified => {
            out.push_str("- The student's location is unknown: quote no prices from either rate table.\n");
            if ctx.asks_about_pricing {
                out.push_str(
                    "- Ask where the student is located so the right rates can be shared.\n",
                );
            }
        }
    }

    match ctx.age {
        AgeSignal::Young(age) => {
            let _ = writeln!(
                out,
                "- The student is {age} years old: include the full readiness checklist, \
                 every item verbatim:"
            );
            for item in &policy.readiness_checklist {
                let _ = writeln!(out, "    - {item}");
            }
        }
        AgeSignal::SchoolAge(_) | AgeSignal::Unspecified => out.push_str(
            "- Do not include the readiness checklist or any of its items.\n",
        ),
    }

    if ctx.prior_experience {
        out.push_str(
            "- The student has prior experience: offer a free evaluation/consultation to \
             understand their current level and discuss goals. Do not offer a trial lesson.\n",
        );
    } else {
        match &ctx.location {
            LocationInterest::Irvine => out.push_str(
                "- Close by offering to schedule a free in-home trial lesson.\n",
            ),
            _ => out.push_str("- Close by offering to schedule a free trial lesson.\n"),
        }
    }

    out.push_str(
        "- Keep the tone professional and courteous throughout; no excitement, slang, \
         exclamation marks, or embellishment.\n",
    );
    let _ = writeln!(
        out,
        "- End the reply with exactly these two lines and nothing after them:\n{}",
        policy.signoff
    );

    out
}
