//! Language sniffing for fenced code blocks.
//!
//! Families are tested in a fixed order and the first family whose
//! conditions all hold wins. Each family is a list of condition groups; a
//! group holds when any of its patterns matches, and the family holds when
//! every group holds.

use regex::Regex;
use std::sync::LazyLock;

/// Languages the sniffer can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Html,
    Css,
    Sql,
    Cpp,
    Shell,
}

impl Language {
    /// The info-string tag written after the opening fence.
    pub fn tag(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Html => "html",
            Self::Css => "css",
            Self::Sql => "sql",
            Self::Cpp => "cpp",
            Self::Shell => "bash",
        }
    }
}

type Pattern = LazyLock<Regex>;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: Pattern = LazyLock::new(|| Regex::new($re).expect("valid language regex"));
    };
}

pattern!(
    JS_KEYWORDS,
    r"\b(?:function|const|let|var|document|window|console|Promise|async|await)\b"
);
pattern!(
    TS_KEYWORDS,
    r"\b(?:interface|type|namespace|enum|as|implements|extends)\b"
);
pattern!(TS_ANNOTATION, r":\s*(?:string|number|boolean|any|void|never)\b");
pattern!(PY_KEYWORDS, r"\b(?:def|class|import|from)\b");
pattern!(PY_MAIN_GUARD, r#"if __name__ == ['"]__main__['"]:"#);
pattern!(PY_VALUES, r"\b(?:self|None|True|False)\b");
pattern!(
    JAVA_MODIFIERS,
    r"\b(?:public|private|protected|class|void|static|final|extends|implements)\b"
);
pattern!(JAVA_TYPES, r"\b(?:String|Integer|Boolean)\b|\bSystem\.out\b");
pattern!(
    HTML_OPEN_TAG,
    r"<(?:!DOCTYPE|html|head|body|div|span|h[1-6]|p|a|img|ul|ol|li|table)[\s>]"
);
pattern!(HTML_CLOSE_TAG, r"</[a-z]+>");
pattern!(CSS_RULE, r"\{[\s\S]*?:[^;{]*;[\s\S]*?\}");
pattern!(
    CSS_PROPERTY,
    r"\b(?:margin|padding|color|background|font|width|height|display|position)\s*:"
);
pattern!(
    SQL_KEYWORDS,
    r"(?i)\b(?:SELECT|INSERT|UPDATE|DELETE|FROM|WHERE|JOIN|GROUP BY|ORDER BY|HAVING)\b"
);
pattern!(
    CPP_TYPES,
    r"\b(?:int|char|float|double|void|struct|class|namespace|template|cout|cin|printf|scanf)\b"
);
pattern!(CPP_FLOW, r"\b(?:return|if|else|for|while|switch)\b");
pattern!(
    SHELL_COMMANDS,
    r"\b(?:echo|export|source|alias|cd|ls|grep|awk|sed|cat|chmod|chown)\b"
);
pattern!(SHELL_EXPANSION, r"\$\{[^}]+\}");
pattern!(SHELL_SHEBANG, r"^#!/bin/(?:ba)?sh");

/// A language family: every group must hold; a group holds if any of its
/// patterns matches.
pub struct Family {
    /// Language named when the family holds
    pub language: Language,
    groups: &'static [&'static [&'static Pattern]],
}

impl Family {
    /// Check whether every condition group of this family holds for `code`.
    pub fn holds(&self, code: &str) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|pattern| pattern.is_match(code)))
    }
}

/// Families in evaluation order.
pub static FAMILIES: &[Family] = &[
    Family {
        language: Language::JavaScript,
        groups: &[&[&JS_KEYWORDS]],
    },
    Family {
        language: Language::TypeScript,
        groups: &[&[&TS_KEYWORDS, &TS_ANNOTATION]],
    },
    Family {
        language: Language::Python,
        groups: &[&[&PY_KEYWORDS, &PY_MAIN_GUARD, &PY_VALUES]],
    },
    Family {
        language: Language::Java,
        groups: &[&[&JAVA_MODIFIERS], &[&JAVA_TYPES]],
    },
    Family {
        language: Language::Html,
        groups: &[&[&HTML_OPEN_TAG, &HTML_CLOSE_TAG]],
    },
    Family {
        language: Language::Css,
        groups: &[&[&CSS_RULE], &[&CSS_PROPERTY]],
    },
    Family {
        language: Language::Sql,
        groups: &[&[&SQL_KEYWORDS]],
    },
    Family {
        language: Language::Cpp,
        groups: &[&[&CPP_TYPES], &[&CPP_FLOW]],
    },
    Family {
        language: Language::Shell,
        groups: &[&[&SHELL_COMMANDS, &SHELL_EXPANSION, &SHELL_SHEBANG]],
    },
];

/// Guess the language of a code fragment; `None` when no family holds.
pub fn sniff(code: &str) -> Option<Language> {
    FAMILIES
        .iter()
        .find(|family| family.holds(code))
        .map(|family| family.language)
}

/// The fence tag for a fragment, or an empty string for an untagged fence.
pub fn fence_tag(code: &str) -> &'static str {
    sniff(code).map(Language::tag).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::javascript("const x = await fetch(url);", Some(Language::JavaScript))]
    #[case::typescript("interface User { name: string }", Some(Language::TypeScript))]
    #[case::ts_annotation("fn(x): number", Some(Language::TypeScript))]
    #[case::python("def greet(name):\n    return name", Some(Language::Python))]
    #[case::python_values("x = None", Some(Language::Python))]
    #[case::java(
        "public static void main(String[] args) {\n  System.out.println(1);\n}",
        Some(Language::Java)
    )]
    #[case::html("<div>hello</div>", Some(Language::Html))]
    #[case::css("body {\n  margin: 0;\n}", Some(Language::Css))]
    #[case::sql("SELECT name FROM users WHERE id = 1", Some(Language::Sql))]
    #[case::sql_lowercase("delete where id = 1", Some(Language::Sql))]
    #[case::cpp("int main() {\n  return 0;\n}", Some(Language::Cpp))]
    #[case::shell("echo hello", Some(Language::Shell))]
    #[case::shebang("#!/bin/sh\nrm -rf build", Some(Language::Shell))]
    #[case::expansion("mkdir ${DIR}", Some(Language::Shell))]
    #[case::unknown("x := y + 1", None)]
    fn test_sniff(#[case] code: &str, #[case] expected: Option<Language>) {
        assert_eq!(sniff(code), expected);
    }

    #[test]
    fn test_first_family_wins() {
        // Matches both JavaScript and TypeScript keyword sets
        let code = "const user: string = 'a'; interface X {}";
        assert_eq!(sniff(code), Some(Language::JavaScript));
    }

    #[test]
    fn test_java_needs_both_groups() {
        assert!(!FAMILIES[3].holds("public void run()"));
        assert!(FAMILIES[3].holds("public void run(String s)"));
    }

    #[test]
    fn test_fence_tag() {
        assert_eq!(fence_tag("SELECT 1 FROM dual"), "sql");
        assert_eq!(fence_tag("echo hi"), "bash");
        assert_eq!(fence_tag("???"), "");
    }
}
