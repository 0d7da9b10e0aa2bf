use std::collections::HashMap;

/// One group of byte-identical provider outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteGroup {
    pub text: String,
    pub votes: usize,
    /// Index of the first provider that produced this text.
    pub first_index: usize,
}

/// Exact-string tally over provider outputs, kept in first-seen order.
/// No SQL normalization: `SELECT 1` and `select 1` are different votes.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    groups: Vec<VoteGroup>,
}

impl VoteTally {
    pub fn from_outputs<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups: Vec<VoteGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (i, out) in outputs.into_iter().enumerate() {
            let text = out.into();
            match index.get(&text) {
                Some(&g) => groups[g].votes += 1,
                None => {
                    index.insert(text.clone(), groups.len());
                    groups.push(VoteGroup {
                        text,
                        votes: 1,
                        first_index: i,
                    });
                }
            }
        }
        Self { groups }
    }

    pub fn groups(&self) -> &[VoteGroup] {
        &self.groups
    }

    /// Largest group; ties go to the group seen first (lowest provider index).
    pub fn winner(&self) -> Option<&VoteGroup> {
        let mut best: Option<&VoteGroup> = None;
        for g in &self.groups {
            if best.map_or(true, |b| g.votes > b.votes) {
                best = Some(g);
            }
        }
        best
    }

    pub fn is_unanimous(&self) -> bool {
        self.groups.len() == 1
    }
}
