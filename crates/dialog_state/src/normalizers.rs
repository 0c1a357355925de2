//! Response normalizers: fold a downstream service's positional reply into
//! the canonical hypothesis schema.
//!
//! Replies arrive as JSON arrays whose field order is fixed per consumer
//! family, so the family is chosen by which entry point the orchestrator
//! calls — never inferred from the payload alone. Shapes outside a family's
//! enumerated arities are rejected as malformed rather than coerced.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dialog::Hypothesis;
use crate::error::{DialogStateError, Result};

// ============================================================================
// Skill replies
// ============================================================================

/// `[text, confidence]` from a plain skill. The empty skill name is kept
/// present — downstream record-keeping distinguishes "anonymous skill" from
/// "no skill field".
pub fn base_reply(reply: &Value) -> Result<Hypothesis> {
    let fields = reply_fields(reply)?;
    expect_arity(fields, &[2], "base skill reply")?;
    let mut hypothesis = Hypothesis::new(
        field_str(fields, 0, "text")?,
        field_f64(fields, 1, "confidence")?,
    );
    hypothesis.skill_name = Some(String::new());
    Ok(hypothesis)
}

/// `[text, confidence]` wrapped as a singleton hypothesis list.
pub fn base_skill_reply(reply: &Value) -> Result<Vec<Hypothesis>> {
    let fields = reply_fields(reply)?;
    expect_arity(fields, &[2], "base skill reply")?;
    Ok(vec![Hypothesis::new(
        field_str(fields, 0, "text")?,
        field_f64(fields, 1, "confidence")?,
    )])
}

// ============================================================================
// Selector replies
// ============================================================================

/// `[skill_name, text, confidence]` or
/// `[skill_name, text, confidence, human_attributes, bot_attributes]`.
pub fn selector_reply(reply: &Value) -> Result<Hypothesis> {
    let fields = reply_fields(reply)?;
    expect_arity(fields, &[3, 5], "selector reply")?;
    let mut hypothesis = Hypothesis::new(
        field_str(fields, 1, "text")?,
        field_f64(fields, 2, "confidence")?,
    )
    .with_skill_name(field_str(fields, 0, "skill_name")?);
    if fields.len() == 5 {
        hypothesis.human_attributes = Some(field_map(fields, 3, "human_attributes")?);
        hypothesis.bot_attributes = Some(field_map(fields, 4, "bot_attributes")?);
    }
    Ok(hypothesis)
}

// ============================================================================
// Classifier replies
// ============================================================================

/// A classifier's verdict. `text` stays a raw JSON value: the empty reply
/// maps to an empty list, not an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub text: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_blacklisted: Option<Value>,
}

/// `[]`, `[text]`, `[text, confidence]` or `[text, confidence, is_blacklisted]`.
pub fn classifier_reply(reply: &Value) -> Result<ClassifierVerdict> {
    let fields = reply_fields(reply)?;
    expect_arity(fields, &[0, 1, 2, 3], "classifier reply")?;
    Ok(ClassifierVerdict {
        text: fields.first().cloned().unwrap_or_else(|| Value::Array(Vec::new())),
        confidence: if fields.len() >= 2 {
            Some(field_f64(fields, 1, "confidence")?)
        } else {
            None
        },
        is_blacklisted: fields.get(2).cloned(),
    })
}

// ============================================================================
// Attribute-bearing skill replies
// ============================================================================

/// `[text, confidence]`, `[.., human_attributes, bot_attributes]` or
/// `[.., extra_fields]`, in single or batched form.
///
/// Batched mode is detected solely from the first two fields both being
/// sequences: each index then yields one independent hypothesis. Attribute
/// fields are either two maps (attached to hypothesis 0) or two sequences
/// (zipped element-wise). An extras map merges into hypothesis 0 only; an
/// extras sequence merges element-wise.
pub fn skill_with_attributes_reply(reply: &Value) -> Result<Vec<Hypothesis>> {
    let fields = reply_fields(reply)?;
    expect_arity(fields, &[2, 4, 5], "attribute skill reply")?;

    let mut hypotheses = match (fields[0].as_array(), fields[1].as_array()) {
        (Some(texts), Some(confidences)) => {
            if texts.len() != confidences.len() {
                return Err(DialogStateError::malformed_reply(format!(
                    "ragged batch: {} texts vs {} confidences",
                    texts.len(),
                    confidences.len()
                )));
            }
            texts
                .iter()
                .zip(confidences)
                .map(|(text, confidence)| {
                    Ok(Hypothesis::new(
                        value_str(text, "text")?,
                        value_f64(confidence, "confidence")?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?
        }
        _ => vec![Hypothesis::new(
            value_str(&fields[0], "text")?,
            value_f64(&fields[1], "confidence")?,
        )],
    };

    if fields.len() >= 4 {
        match (&fields[2], &fields[3]) {
            (Value::Object(human), Value::Object(bot)) => {
                if let Some(first) = hypotheses.first_mut() {
                    first.human_attributes = Some(human.clone());
                    first.bot_attributes = Some(bot.clone());
                }
            }
            (Value::Array(human), Value::Array(bot)) => {
                for (hypothesis, (h, b)) in hypotheses.iter_mut().zip(human.iter().zip(bot)) {
                    hypothesis.human_attributes = Some(value_map(h, "human_attributes")?);
                    hypothesis.bot_attributes = Some(value_map(b, "bot_attributes")?);
                }
            }
            _ => {
                return Err(DialogStateError::malformed_reply(
                    "attribute fields must both be mappings or both be sequences",
                ))
            }
        }
    }

    if fields.len() == 5 {
        match &fields[4] {
            Value::Object(extra) => {
                if let Some(first) = hypotheses.first_mut() {
                    first.extra.extend(extra.clone());
                }
            }
            Value::Array(extras) => {
                for (hypothesis, extra) in hypotheses.iter_mut().zip(extras) {
                    hypothesis.extra.extend(value_map(extra, "extra fields")?);
                }
            }
            _ => {
                return Err(DialogStateError::malformed_reply(
                    "extras field must be a mapping or a sequence of mappings",
                ))
            }
        }
    }

    Ok(hypotheses)
}

// ============================================================================
// Annotator replies
// ============================================================================

/// Pass-through for annotators whose reply already is the annotation payload
/// (punctuation, segmentation, intent catching).
pub fn simple_reply(reply: &Value) -> Value {
    reply.clone()
}

/// `{batch: [..]}` — the record shape for batched annotators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorBatch {
    pub batch: Vec<Value>,
}

/// Wrap an annotator's positional reply as a batch record.
pub fn annotator_batch_reply(reply: &Value) -> Result<AnnotatorBatch> {
    Ok(AnnotatorBatch {
        batch: reply_fields(reply)?.to_vec(),
    })
}

// ============================================================================
// Field access
// ============================================================================

fn reply_fields(reply: &Value) -> Result<&[Value]> {
    reply
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| DialogStateError::malformed_reply("reply is not a positional sequence"))
}

fn expect_arity(fields: &[Value], allowed: &[usize], family: &str) -> Result<()> {
    if allowed.contains(&fields.len()) {
        Ok(())
    } else {
        Err(DialogStateError::malformed_reply(format!(
            "{family} takes {allowed:?} fields, got {}",
            fields.len()
        )))
    }
}

fn field_str(fields: &[Value], index: usize, what: &str) -> Result<String> {
    value_str(&fields[index], what)
}

fn field_f64(fields: &[Value], index: usize, what: &str) -> Result<f64> {
    value_f64(&fields[index], what)
}

fn field_map(fields: &[Value], index: usize, what: &str) -> Result<Map<String, Value>> {
    value_map(&fields[index], what)
}

fn value_str(value: &Value, what: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DialogStateError::malformed_reply(format!("{what} is not a string")))
}

fn value_f64(value: &Value, what: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| DialogStateError::malformed_reply(format!("{what} is not a number")))
}

fn value_map(value: &Value, what: &str) -> Result<Map<String, Value>> {
    value
        .as_object()
        .cloned()
        .ok_or_else(|| DialogStateError::malformed_reply(format!("{what} is not a mapping")))
}
