//! Naming conventions between entity types, tables and associations.
//!
//! The record layer only consumes the [`Inflector`] trait: table names are
//! derived with `tableize`, association targets with `classify`, and the
//! `<singular>_ids` accessors with `singularize`/`pluralize`. [`English`] is
//! the rule-based default; schemas can install their own implementation.

/// Word inflection used to derive conventional names.
pub trait Inflector: Send + Sync {
    /// `comment` -> `comments`
    fn pluralize(&self, word: &str) -> String;

    /// `comments` -> `comment`
    fn singularize(&self, word: &str) -> String;

    /// `BlogPost` -> `blog_posts`
    fn tableize(&self, type_name: &str) -> String {
        self.pluralize(&to_snake_case(type_name))
    }

    /// `blog_posts` -> `BlogPost`
    fn classify(&self, snake_name: &str) -> String {
        to_pascal_case(&self.singularize(snake_name))
    }
}

/// Simple English inflection rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct English;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("mouse", "mice"),
    ("datum", "data"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("analysis", "analyses"),
    ("crisis", "crises"),
    ("axis", "axes"),
];

const FE_WORDS: &[&str] = &["knives", "wives", "lives"];

/// Singulars ending in `-us` that pluralize with `-es`. Other `-uses`
/// plurals (houses, causes, fuses) come from `-use` singulars.
const US_WORDS: &[&str] = &[
    "status", "bus", "virus", "campus", "census", "bonus", "focus", "genus", "sinus",
    "surplus", "apparatus", "hiatus", "prospectus", "plus", "octopus", "walrus", "chorus",
    "circus", "corpus", "onus", "thesaurus", "syllabus", "abacus", "cactus", "fungus",
    "radius", "stimulus", "nexus", "lotus", "minus",
];

const O_EXCEPTIONS: &[&str] = &["photo", "piano", "halo", "memo", "pro", "auto"];

/// Split `blog_post` into (`blog_`, `post`) so rules apply to the last word.
fn split_last_word(word: &str) -> (&str, &str) {
    match word.rfind('_') {
        Some(pos) => word.split_at(pos + 1),
        None => ("", word),
    }
}

fn is_vowel(c: char) -> bool {
    "aeiou".contains(c)
}

impl Inflector for English {
    fn pluralize(&self, word: &str) -> String {
        let (head, last) = split_last_word(word);
        if last.is_empty() {
            return word.to_string();
        }
        if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == last) {
            return format!("{head}{plural}");
        }

        if last.ends_with('s')
            || last.ends_with('x')
            || last.ends_with("ch")
            || last.ends_with("sh")
        {
            return format!("{word}es");
        }

        // quiz -> quizzes, fez -> fezzes
        if last.ends_with('z') {
            let second_last = last.chars().rev().nth(1);
            if second_last.is_some_and(is_vowel) {
                return format!("{word}zes");
            }
            return format!("{word}es");
        }

        if let Some(stripped) = word.strip_suffix('y') {
            if stripped.chars().last().is_some_and(|c| !is_vowel(c)) {
                return format!("{stripped}ies");
            }
            return format!("{word}s");
        }

        if let Some(stripped) = word.strip_suffix("fe") {
            return format!("{stripped}ves");
        }
        if let Some(stripped) = word.strip_suffix('f') {
            return format!("{stripped}ves");
        }

        if last.ends_with('o') && !O_EXCEPTIONS.contains(&last) {
            let second_last = last.chars().rev().nth(1);
            if second_last.is_some_and(|c| !is_vowel(c)) {
                return format!("{word}es");
            }
        }

        format!("{word}s")
    }

    fn singularize(&self, word: &str) -> String {
        let (head, last) = split_last_word(word);
        if last.is_empty() {
            return word.to_string();
        }
        if let Some((singular, _)) = IRREGULAR.iter().find(|(_, p)| *p == last) {
            return format!("{head}{singular}");
        }
        if IRREGULAR.iter().any(|(s, _)| *s == last) {
            return word.to_string();
        }

        if let Some(stripped) = word.strip_suffix("ies") {
            return format!("{stripped}y");
        }
        if let Some(stripped) = word.strip_suffix("ves") {
            if FE_WORDS.contains(&last) {
                return format!("{stripped}fe");
            }
            return format!("{stripped}f");
        }
        if let Some(stem) = last.strip_suffix("es") {
            if US_WORDS.contains(&stem) {
                return format!("{head}{stem}");
            }
        }
        if let Some(stripped) = word.strip_suffix("zzes") {
            return format!("{stripped}z");
        }
        for suffix in ["sses", "xes", "ches", "shes", "zes", "oes"] {
            if word.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }
        if let Some(stripped) = word.strip_suffix('s') {
            if !stripped.ends_with('s') {
                return stripped.to_string();
            }
        }
        word.to_string()
    }
}

/// Convert PascalCase to snake_case.
///
/// - `Post` -> `post`
/// - `BlogPost` -> `blog_post`
/// - `HTTPServer` -> `http_server`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next = chars.get(i + 1).copied();
                let should_underscore = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()));
                if should_underscore {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert snake_case to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        let en = English;
        assert_eq!(en.pluralize("post"), "posts");
        assert_eq!(en.pluralize("comment"), "comments");
        assert_eq!(en.pluralize("hero"), "heroes");
        assert_eq!(en.pluralize("photo"), "photos");
        assert_eq!(en.pluralize("box"), "boxes");
        assert_eq!(en.pluralize("quiz"), "quizzes");
        assert_eq!(en.pluralize("category"), "categories");
        assert_eq!(en.pluralize("day"), "days");
        assert_eq!(en.pluralize("leaf"), "leaves");
        assert_eq!(en.pluralize("wife"), "wives");
        assert_eq!(en.pluralize("person"), "people");
        assert_eq!(en.pluralize("blog_post"), "blog_posts");
        assert_eq!(en.pluralize("sales_person"), "sales_people");
    }

    #[test]
    fn test_singularize() {
        let en = English;
        assert_eq!(en.singularize("posts"), "post");
        assert_eq!(en.singularize("comments"), "comment");
        assert_eq!(en.singularize("heroes"), "hero");
        assert_eq!(en.singularize("boxes"), "box");
        assert_eq!(en.singularize("quizzes"), "quiz");
        assert_eq!(en.singularize("categories"), "category");
        assert_eq!(en.singularize("leaves"), "leaf");
        assert_eq!(en.singularize("wives"), "wife");
        assert_eq!(en.singularize("people"), "person");
        assert_eq!(en.singularize("addresses"), "address");
        assert_eq!(en.singularize("address"), "address");
        assert_eq!(en.singularize("blog_posts"), "blog_post");
    }

    #[test]
    fn test_singularize_inverts_pluralize_for_common_words() {
        let en = English;
        for word in ["post", "comment", "tag", "category", "box", "child", "match"] {
            assert_eq!(en.singularize(&en.pluralize(word)), word);
        }
    }

    #[test]
    fn test_us_words_round_trip() {
        let en = English;
        for word in ["status", "bus", "virus", "campus", "order_status"] {
            assert_eq!(en.singularize(&en.pluralize(word)), word);
        }
        assert_eq!(en.pluralize("status"), "statuses");
        assert_eq!(en.classify("statuses"), "Status");
        assert_eq!(en.singularize("houses"), "house");
        assert_eq!(en.singularize("causes"), "cause");
    }

    #[test]
    fn test_tableize_and_classify() {
        let en = English;
        assert_eq!(en.tableize("Post"), "posts");
        assert_eq!(en.tableize("BlogPost"), "blog_posts");
        assert_eq!(en.tableize("Person"), "people");
        assert_eq!(en.classify("comments"), "Comment");
        assert_eq!(en.classify("blog_posts"), "BlogPost");
        assert_eq!(en.classify("author"), "Author");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("Hero"), "hero");
        assert_eq!(to_snake_case("TeamMember"), "team_member");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
    }
}
