use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Store-assigned book identifier.
pub type BookId = i64;

/// A book on the reading list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Assigned by the store on insert; never reused
    pub id: BookId,
    /// Assigned by the store on insert
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub title: String,
    /// Year of publication
    pub published: i32,
    pub pages: u32,
    pub genres: Vec<String>,
    /// Conventionally 0.0 to 5.0; not enforced
    pub rating: f64,
    /// Starts at 1 and increments on every successful update
    pub version: i64,
}

/// Request model for creating a new book.
///
/// Missing fields take their zero value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreateBook {
    pub title: String,
    pub published: i32,
    pub pages: u32,
    pub genres: Vec<String>,
    pub rating: f64,
}

/// One field of a partial update: either left out of the request or supplied.
///
/// Only the absent case comes from a missing key; an explicit `null` is
/// rejected during decoding because no book field is nullable.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Present(T),
}

impl<T> Field<T> {
    /// Overwrite `target` when a value was supplied.
    pub fn apply(self, target: &mut T) {
        if let Field::Present(value) = self {
            *target = value;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Field::Present)
    }
}

/// Request model for a partial update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookPatch {
    pub title: Field<String>,
    pub published: Field<i32>,
    pub pages: Field<u32>,
    pub genres: Field<Vec<String>>,
    pub rating: Field<f64>,
}

impl BookPatch {
    /// Merge the supplied fields into `book`.
    ///
    /// `genres` is replaced only by a non-empty list, so a patch cannot clear
    /// a book's genres.
    pub fn apply_to(self, book: &mut Book) {
        self.title.apply(&mut book.title);
        self.published.apply(&mut book.published);
        self.pages.apply(&mut book.pages);
        self.rating.apply(&mut book.rating);

        if let Field::Present(genres) = self.genres {
            if !genres.is_empty() {
                book.genres = genres;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn dune() -> Book {
        Book {
            id: 1,
            created_at: datetime!(2024-03-01 12:30:45.123456789 UTC),
            title: "Dune".to_string(),
            published: 1965,
            pages: 412,
            genres: vec!["scifi".to_string(), "classic".to_string()],
            rating: 4.8,
            version: 1,
        }
    }

    #[test]
    fn book_serializes_with_camel_case_and_rfc3339() {
        let value = serde_json::to_value(dune()).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["createdAt"], "2024-03-01T12:30:45.123456789Z");
        assert_eq!(value["genres"], serde_json::json!(["scifi", "classic"]));
        assert_eq!(value["version"], 1);
    }

    #[test]
    fn book_round_trips_through_json() {
        let book = dune();
        let bytes = serde_json::to_vec(&book).unwrap();
        let decoded: Book = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, book);
    }

    #[test]
    fn create_book_defaults_missing_fields() {
        let input: CreateBook = serde_json::from_str(r#"{"title":"Dune"}"#).unwrap();
        assert_eq!(
            input,
            CreateBook {
                title: "Dune".to_string(),
                ..CreateBook::default()
            }
        );
    }

    #[test]
    fn patch_distinguishes_absent_from_zero() {
        let patch: BookPatch = serde_json::from_str(r#"{"pages":0,"rating":0.0}"#).unwrap();
        assert_eq!(patch.title, Field::Absent);
        assert_eq!(patch.published, Field::Absent);
        assert_eq!(patch.pages, Field::Present(0));
        assert_eq!(patch.rating, Field::Present(0.0));
        assert_eq!(patch.genres, Field::Absent);
    }

    #[test]
    fn patch_rejects_explicit_null() {
        assert!(serde_json::from_str::<BookPatch>(r#"{"title":null}"#).is_err());
        assert!(serde_json::from_str::<BookPatch>(r#"{"genres":null}"#).is_err());
    }

    #[test]
    fn patch_ignores_unknown_and_immutable_fields() {
        let patch: BookPatch =
            serde_json::from_str(r#"{"id":99,"version":7,"rating":5.0}"#).unwrap();
        let mut book = dune();
        patch.apply_to(&mut book);
        assert_eq!(book.id, 1);
        assert_eq!(book.version, 1);
        assert_eq!(book.rating, 5.0);
    }

    #[test]
    fn apply_overwrites_only_present_fields() {
        let mut book = dune();
        let patch = BookPatch {
            title: Field::Present("Dune Messiah".to_string()),
            pages: Field::Present(0),
            ..BookPatch::default()
        };
        patch.apply_to(&mut book);

        let original = dune();
        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.pages, 0);
        assert_eq!(book.published, original.published);
        assert_eq!(book.genres, original.genres);
        assert_eq!(book.rating, original.rating);
        assert_eq!(book.created_at, original.created_at);
    }

    #[test]
    fn empty_genres_leave_existing_genres() {
        let mut book = dune();
        BookPatch {
            genres: Field::Present(Vec::new()),
            ..BookPatch::default()
        }
        .apply_to(&mut book);
        assert_eq!(book.genres, dune().genres);

        BookPatch {
            genres: Field::Present(vec!["space opera".to_string()]),
            ..BookPatch::default()
        }
        .apply_to(&mut book);
        assert_eq!(book.genres, vec!["space opera".to_string()]);
    }

    #[test]
    fn empty_patch_is_identity() {
        let mut book = dune();
        BookPatch::default().apply_to(&mut book);
        assert_eq!(book, dune());
    }
}
