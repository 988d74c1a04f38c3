use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::{TutorError, TutorResult};

/// Ordered, duplicate-free set of topics the simulation draws from.
///
/// A curriculum is never empty and only grows, through [`Curriculum::append_if_absent`].
/// [`Curriculum::new`] is the only constructor, so the invariant holds for every value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Curriculum {
    topics: Vec<String>,
}

impl Curriculum {
    /// Build a curriculum from initial topics. Blank entries are dropped and
    /// repeated entries keep their first position.
    pub fn new<I, T>(topics: I) -> TutorResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut curriculum = Self { topics: Vec::new() };
        for topic in topics {
            curriculum.append_if_absent(topic);
        }

        if curriculum.topics.is_empty() {
            return Err(TutorError::invalid_argument(
                "a curriculum needs at least one topic",
            ));
        }
        Ok(curriculum)
    }

    /// Append `topic` unless it is blank or already present. Returns whether it was added.
    pub fn append_if_absent(&mut self, topic: impl Into<String>) -> bool {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() || self.contains(&topic) {
            debug!("Curriculum already covers '{}'", topic);
            return false;
        }
        self.topics.push(topic);
        true
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    /// Most recently added topic
    pub fn latest(&self) -> &str {
        &self.topics[self.topics.len() - 1]
    }

    /// Pick a topic uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.topics[rng.random_range(0..self.topics.len())]
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn into_topics(self) -> Vec<String> {
        self.topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_initial_duplicates_collapse() {
        let curriculum =
            Curriculum::new(["Basic Math", " Fractions ", "Basic Math", ""]).unwrap();
        assert_eq!(curriculum.topics(), &["Basic Math", "Fractions"]);
        assert_eq!(curriculum.latest(), "Fractions");
    }

    #[test]
    fn test_empty_curriculum_is_rejected() {
        assert!(Curriculum::new(Vec::<String>::new()).is_err());
        assert!(Curriculum::new(["   "]).is_err());
    }

    #[test]
    fn test_append_if_absent_grows_monotonically() {
        let mut curriculum = Curriculum::new(["Basic Math"]).unwrap();
        let mut previous_len = curriculum.len();

        for topic in ["Advanced Math", "Basic Math", "Fractions", "Advanced Math", " "] {
            curriculum.append_if_absent(topic);
            assert!(curriculum.len() >= previous_len);
            previous_len = curriculum.len();

            let unique: HashSet<_> = curriculum.topics().iter().collect();
            assert_eq!(unique.len(), curriculum.len());
        }

        assert_eq!(
            curriculum.topics(),
            &["Basic Math", "Advanced Math", "Fractions"]
        );
    }

    #[test]
    fn test_topics_handed_out_are_members() {
        let mut curriculum = Curriculum::new(["Basic Math"]).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(curriculum.latest(), "Basic Math");

        curriculum.append_if_absent("Fractions");
        curriculum.append_if_absent("  ");
        assert_eq!(curriculum.latest(), "Fractions");
        for _ in 0..50 {
            let topic = curriculum.choose(&mut rng).to_string();
            assert!(curriculum.contains(&topic));
        }
    }

    #[test]
    fn test_choose_covers_every_topic() {
        let curriculum = Curriculum::new(["a", "b", "c"]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let seen: HashSet<_> = (0..200).map(|_| curriculum.choose(&mut rng)).collect();
        assert_eq!(seen.len(), 3);
    }
}
