use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Probability sums must land within this distance of 1.
pub const SUM_TOLERANCE: f64 = 1e-6;

// Raw model output closer than this to a probability vector is renormalized
// instead of being run through softmax.
const RAW_PROBABILITY_TOLERANCE: f64 = 1e-3;

pub const LABEL_COUNT: usize = 7;

/// Emotion labels in classifier output order. Declaration order is the fixed
/// enumeration order used for tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Angry,
    Disgusted,
    Fearful,
    Happy,
    Neutral,
    Sad,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; LABEL_COUNT] = [
        Emotion::Angry,
        Emotion::Disgusted,
        Emotion::Fearful,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprised,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgusted => "Disgusted",
            Emotion::Fearful => "Fearful",
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Sad => "Sad",
            Emotion::Surprised => "Surprised",
        }
    }

    pub fn mental_state(self) -> &'static str {
        match self {
            Emotion::Angry => "Stressed or Irritated",
            Emotion::Disgusted => "Uncomfortable or Repulsed",
            Emotion::Fearful => "Anxious or Scared",
            Emotion::Happy => "Positive or Joyful",
            Emotion::Neutral => "Calm or Composed",
            Emotion::Sad => "Down or Depressed",
            Emotion::Surprised => "Astonished or Shocked",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    #[error("expected 7 scores, got {0}")]
    WrongLength(usize),
    #[error("probability for {0} is outside [0, 1]: {1}")]
    OutOfRange(Emotion, f64),
    #[error("probabilities sum to {0}, expected 1")]
    BadSum(f64),
}

/// Probability per label, indexed by `Emotion::index`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<Emotion, f64>")]
pub struct EmotionDistribution {
    probabilities: [f64; LABEL_COUNT],
}

impl EmotionDistribution {
    pub fn new(probabilities: [f64; LABEL_COUNT]) -> Result<Self, DistributionError> {
        for (label, p) in Emotion::ALL.iter().zip(probabilities) {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(DistributionError::OutOfRange(*label, p));
            }
        }

        let sum: f64 = probabilities.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(DistributionError::BadSum(sum));
        }

        Ok(Self { probabilities })
    }

    /// Labels not named get zero probability.
    pub fn from_pairs(pairs: &[(Emotion, f64)]) -> Result<Self, DistributionError> {
        let mut probabilities = [0.; LABEL_COUNT];
        for (label, p) in pairs {
            probabilities[label.index()] = *p;
        }
        Self::new(probabilities)
    }

    /// Builds a distribution from raw classifier output, which may either be
    /// probabilities already or unnormalized logits.
    pub fn from_scores(scores: &[f32]) -> Result<Self, DistributionError> {
        if scores.len() != LABEL_COUNT {
            return Err(DistributionError::WrongLength(scores.len()));
        }

        let raw: Vec<f64> = scores.iter().map(|&s| s as f64).collect();
        let sum: f64 = raw.iter().sum();
        let is_probability = raw.iter().all(|p| p.is_finite() && *p >= 0.)
            && (sum - 1.).abs() <= RAW_PROBABILITY_TOLERANCE;

        let mut probabilities = [0.; LABEL_COUNT];
        if is_probability {
            for (out, p) in probabilities.iter_mut().zip(&raw) {
                *out = p / sum;
            }
        } else {
            let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exp_sum: f64 = raw.iter().map(|x| (x - max).exp()).sum();
            for (out, x) in probabilities.iter_mut().zip(&raw) {
                *out = (x - max).exp() / exp_sum;
            }
        }

        Self::new(probabilities)
    }

    pub fn get(&self, label: Emotion) -> f64 {
        self.probabilities[label.index()]
    }

    pub fn probabilities(&self) -> &[f64; LABEL_COUNT] {
        &self.probabilities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.iter().map(|&label| (label, self.get(label)))
    }

    pub fn argmax(&self) -> Emotion {
        first_max(&self.probabilities)
    }
}

/// Index of the first maximum, as an emotion label.
pub(crate) fn first_max(values: &[f64; LABEL_COUNT]) -> Emotion {
    let mut best = Emotion::ALL[0];
    for label in Emotion::ALL.iter().skip(1) {
        // strictly greater, so earlier labels keep ties
        if values[label.index()] > values[best.index()] {
            best = *label;
        }
    }
    best
}

/// Serializes as a label → value map in enumeration order.
pub(crate) fn serialize_scores<S: Serializer>(
    values: &[f64; LABEL_COUNT],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(LABEL_COUNT))?;
    for label in Emotion::ALL {
        map.serialize_entry(&label, &values[label.index()])?;
    }
    map.end()
}

impl Serialize for EmotionDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_scores(&self.probabilities, serializer)
    }
}

impl TryFrom<BTreeMap<Emotion, f64>> for EmotionDistribution {
    type Error = DistributionError;

    fn try_from(map: BTreeMap<Emotion, f64>) -> Result<Self, Self::Error> {
        let pairs: Vec<(Emotion, f64)> = map.into_iter().collect();
        Self::from_pairs(&pairs)
    }
}
