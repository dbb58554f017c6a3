use crate::emotion::{Emotion, EmotionDistribution, LABEL_COUNT, first_max, serialize_scores};
use crate::error::{AnalysisError, Result};
use serde::Serialize;

/// Mean emotion distribution over every face found in a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    #[serde(serialize_with = "serialize_scores")]
    scores: [f64; LABEL_COUNT],
    dominant_label: Emotion,
    samples: usize,
    #[serde(serialize_with = "serialize_votes")]
    votes: [u32; LABEL_COUNT],
}

impl AggregateResult {
    pub fn score(&self, label: Emotion) -> f64 {
        self.scores[label.index()]
    }

    pub fn scores(&self) -> &[f64; LABEL_COUNT] {
        &self.scores
    }

    pub fn dominant_label(&self) -> Emotion {
        self.dominant_label
    }

    /// Number of pooled distributions.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// How many pooled distributions had `label` as their own top label.
    pub fn votes(&self, label: Emotion) -> u32 {
        self.votes[label.index()]
    }

    pub fn all_votes(&self) -> &[u32; LABEL_COUNT] {
        &self.votes
    }
}

/// Pools every distribution uniformly and averages per label. The dominant
/// label is the first label, in enumeration order, holding the highest mean.
pub fn aggregate(distributions: &[EmotionDistribution]) -> Result<AggregateResult> {
    if distributions.is_empty() {
        return Err(AnalysisError::NoFaceDetected);
    }

    let mut sums = [0f64; LABEL_COUNT];
    let mut votes = [0u32; LABEL_COUNT];
    for d in distributions {
        for (sum, p) in sums.iter_mut().zip(d.probabilities()) {
            *sum += p;
        }
        votes[d.argmax().index()] += 1;
    }

    let n = distributions.len() as f64;
    let scores = sums.map(|s| s / n);

    Ok(AggregateResult {
        scores,
        dominant_label: first_max(&scores),
        samples: distributions.len(),
        votes,
    })
}

fn serialize_votes<S: serde::Serializer>(
    votes: &[u32; LABEL_COUNT],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(LABEL_COUNT))?;
    for label in Emotion::ALL {
        map.serialize_entry(&label, &votes[label.index()])?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::SUM_TOLERANCE;

    fn dist(pairs: &[(Emotion, f64)]) -> EmotionDistribution {
        EmotionDistribution::from_pairs(pairs).unwrap()
    }

    #[test]
    fn test_single_distribution_passes_through() -> Result<()> {
        let d = dist(&[(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)]);
        let res = aggregate(&[d])?;

        assert_eq!(res.scores(), d.probabilities());
        assert_eq!(res.dominant_label(), Emotion::Happy);
        assert_eq!(res.samples(), 1);
        assert_eq!(res.votes(Emotion::Happy), 1);
        Ok(())
    }

    #[test]
    fn test_mean_of_opposites_ties_to_first_label() -> Result<()> {
        let res = aggregate(&[dist(&[(Emotion::Sad, 1.)]), dist(&[(Emotion::Happy, 1.)])])?;

        assert_eq!(res.score(Emotion::Happy), 0.5);
        assert_eq!(res.score(Emotion::Sad), 0.5);
        assert_eq!(res.score(Emotion::Angry), 0.);
        assert_eq!(res.dominant_label(), Emotion::Happy);
        Ok(())
    }

    #[test]
    fn test_tie_break_is_enumeration_order_not_input_order() -> Result<()> {
        let fear = dist(&[(Emotion::Fearful, 1.)]);
        let anger = dist(&[(Emotion::Angry, 1.)]);

        for _ in 0..5 {
            assert_eq!(aggregate(&[fear, anger])?.dominant_label(), Emotion::Angry);
            assert_eq!(aggregate(&[anger, fear])?.dominant_label(), Emotion::Angry);
        }
        Ok(())
    }

    #[test]
    fn test_scores_sum_to_one() -> Result<()> {
        let inputs: Vec<EmotionDistribution> = (0..37)
            .map(|i| {
                let raw: Vec<f32> = (0..7).map(|j| ((i * 7 + j) % 11) as f32 * 0.37).collect();
                EmotionDistribution::from_scores(&raw).unwrap()
            })
            .collect();
        let res = aggregate(&inputs)?;

        let sum: f64 = res.scores().iter().sum();
        assert!((sum - 1.).abs() < SUM_TOLERANCE);
        assert_eq!(res.all_votes().iter().sum::<u32>(), 37);
        Ok(())
    }

    #[test]
    fn test_aggregate_is_idempotent() -> Result<()> {
        let inputs = [
            dist(&[(Emotion::Surprised, 0.3), (Emotion::Neutral, 0.7)]),
            dist(&[(Emotion::Disgusted, 0.25), (Emotion::Neutral, 0.75)]),
        ];
        assert_eq!(aggregate(&inputs)?, aggregate(&inputs)?);
        Ok(())
    }

    #[test]
    fn test_empty_is_no_face_detected() {
        assert!(matches!(aggregate(&[]), Err(AnalysisError::NoFaceDetected)));
    }
}
