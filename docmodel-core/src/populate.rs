//! Single-stage left-outer lookups.

use bson::{Document, doc};

/// Describes one populate (`$lookup`) join.
///
/// The documents of `foreign_model` whose `_id` appears in `local_field` are attached to each
/// matched document as an array under `as_field`. The array is empty, never absent, when
/// nothing matches.
///
/// # Example
///
/// ```ignore
/// let populate = Populate::new("quizzes.ids", "quiz_templates", "quizzes.data");
/// let campaigns = campaign_wrapper
///     .find_many_populate(doc! { "_id": campaign_id }, &populate)
///     .await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    pub local_field: String,
    pub foreign_model: String,
    pub as_field: String,
}

impl Populate {
    pub fn new(
        local_field: impl Into<String>,
        foreign_model: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            local_field: local_field.into(),
            foreign_model: foreign_model.into(),
            as_field: as_field.into(),
        }
    }

    /// The `$lookup` stage for this join.
    pub fn lookup_stage(&self) -> Document {
        doc! {
            "$lookup": {
                "from": self.foreign_model.as_str(),
                "localField": self.local_field.as_str(),
                "foreignField": "_id",
                "as": self.as_field.as_str(),
            }
        }
    }

    /// The two-stage pipeline: `$match` on `match_query`, then the lookup.
    pub fn pipeline(&self, match_query: Document) -> Vec<Document> {
        vec![doc! { "$match": match_query }, self.lookup_stage()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_shape() {
        let populate = Populate::new("friends", "users", "friend_docs");
        let pipeline = populate.pipeline(doc! { "role": "King" });

        assert_eq!(
            pipeline,
            vec![
                doc! { "$match": { "role": "King" } },
                doc! {
                    "$lookup": {
                        "from": "users",
                        "localField": "friends",
                        "foreignField": "_id",
                        "as": "friend_docs",
                    }
                },
            ]
        );
    }

    #[test]
    fn empty_match_is_kept() {
        let pipeline = Populate::new("a", "b", "c").pipeline(Document::new());

        assert_eq!(pipeline[0], doc! { "$match": {} });
        assert_eq!(pipeline.len(), 2);
    }
}
