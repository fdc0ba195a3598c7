use bookshelf_http::extract::{lenient_field, lookup_field, LenientDecode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A catalog record. Every field defaults so that partial request bodies
/// still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    /// Store-assigned identifier, numeric in practice
    pub id: String,
    pub isbn: String,
    pub title: String,
    pub author: Option<Author>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Author {
    pub first_name: String,
    pub last_name: String,
}

impl LenientDecode for Book {
    /// A non-object or mistyped `author` is dropped to `None`.
    fn decode_lenient(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };

        Self {
            id: lenient_field(fields, "id"),
            isbn: lenient_field(fields, "isbn"),
            title: lenient_field(fields, "title"),
            author: lookup_field(fields, "author")
                .filter(|author| author.is_object())
                .map(Author::decode_lenient),
        }
    }
}

impl LenientDecode for Author {
    fn decode_lenient(value: &Value) -> Self {
        let Some(fields) = value.as_object() else {
            return Self::default();
        };

        Self {
            first_name: lenient_field(fields, "firstName"),
            last_name: lenient_field(fields, "lastName"),
        }
    }
}

impl Author {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_in_wire_order_with_null_author() {
        let book = Book {
            id: "3".to_string(),
            title: "X".to_string(),
            ..Book::default()
        };

        assert_eq!(
            serde_json::to_string(&book).unwrap(),
            r#"{"id":"3","isbn":"","title":"X","author":null}"#
        );
    }

    #[test]
    fn author_uses_camel_case_names() {
        let book: Book = serde_json::from_value(json!({
            "title": "Dune",
            "author": {"firstName": "Frank", "lastName": "Herbert"}
        }))
        .unwrap();

        assert_eq!(book.author, Some(Author::new("Frank", "Herbert")));
        assert_eq!(book.id, "");
        assert_eq!(book.isbn, "");
    }

    #[test]
    fn lenient_decode_keeps_fields_that_decode() {
        let book = Book::decode_lenient(&json!({
            "title": "X",
            "isbn": 42,
            "author": {"firstName": "A", "lastName": null}
        }));

        assert_eq!(
            book,
            Book {
                title: "X".to_string(),
                author: Some(Author::new("A", "")),
                ..Book::default()
            }
        );
    }

    #[test]
    fn lenient_decode_drops_a_mistyped_author() {
        for author in [json!(null), json!("Frank Herbert"), json!(["Frank"])] {
            let book = Book::decode_lenient(&json!({"title": "Dune", "author": author.clone()}));
            assert_eq!(book.title, "Dune");
            assert_eq!(book.author, None, "author {author}");
        }

        assert_eq!(Book::decode_lenient(&json!([1, 2])), Book::default());
    }
}
