//! Parsed form of a CSL style.
//!
//! Only what a single bibliography entry needs is modelled. Sorting,
//! disambiguation, and citation grouping have no representation here.

use std::collections::HashMap;

/// One `<style>` document after parsing and macro validation.
#[derive(Debug, Clone)]
pub struct Style {
    pub version: String,
    pub class: StyleClass,
    /// `default-locale` on the root, used to pick the locale file.
    pub default_locale: Option<String>,
    pub info: Option<StyleInfo>,
    /// `<locale>` blocks inside the style; these win over locale files.
    pub locales: Vec<Locale>,
    pub macros: HashMap<String, Macro>,
    /// Required by CSL and checked for undefined macros at parse time.
    /// Entries are rendered from `bibliography`, never from this layout.
    pub citation: Layout,
    /// Entries are rendered from this layout. Styles without one cannot
    /// produce a reference-list entry.
    pub bibliography: Option<Layout>,
    /// Name attributes set on `<style>` itself.
    pub name_options: InheritableNameOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleClass {
    InText,
    Note,
}

impl StyleClass {
    /// The `class` attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleClass::InText => "in-text",
            StyleClass::Note => "note",
        }
    }
}

/// The parts of `<info>` that are kept: `<title>` and `<id>`.
#[derive(Debug, Clone, Default)]
pub struct StyleInfo {
    pub title: Option<String>,
    pub id: Option<String>,
}

/// Terms and options from a `<locale>` element or a locale file.
#[derive(Debug, Clone, Default)]
pub struct Locale {
    /// `xml:lang`; absent on in-style overrides that apply to every language.
    pub lang: Option<String>,
    pub terms: Vec<Term>,
    /// `<style-options punctuation-in-quote="true">`
    pub punctuation_in_quote: Option<bool>,
}

/// A localized word such as "and", "et-al", or "page".
///
/// A term carries either a bare value or a `<single>`/`<multiple>` pair.
#[derive(Debug, Clone)]
pub struct Term {
    pub name: String,
    pub form: TermForm,
    pub single: Option<String>,
    pub multiple: Option<String>,
    pub value: Option<String>,
}

impl Term {
    /// Text for singular or plural use. Plural falls back to the singular
    /// form, and both fall back to the bare value.
    pub fn text(&self, plural: bool) -> Option<&str> {
        let picked = if plural {
            self.multiple.as_deref().or(self.single.as_deref())
        } else {
            self.single.as_deref()
        };
        picked.or(self.value.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermForm {
    #[default]
    Long,
    Short,
    Verb,
    VerbShort,
    Symbol,
}

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub elements: Vec<Element>,
}

/// The `<layout>` of `<citation>` or `<bibliography>`.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub formatting: Formatting,
    pub delimiter: Option<String>,
    /// Name attributes written on the enclosing `<citation>`/`<bibliography>`.
    pub name_options: InheritableNameOptions,
    pub elements: Vec<Element>,
}

/// `<name>` attributes that cascade from `<style>` down through the layout
/// to each `<name>`. `None` means "not set at this level".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InheritableNameOptions {
    pub and: Option<NameAnd>,
    /// Between names; ", " when unset everywhere.
    pub delimiter: Option<String>,
    pub delimiter_precedes_last: Option<DelimiterPrecedesLast>,
    /// Truncate the list when it has at least this many names...
    pub et_al_min: Option<u32>,
    /// ...keeping this many before "et al."
    pub et_al_use_first: Option<u32>,
    /// When set, given names are reduced to initials followed by this string.
    pub initialize_with: Option<String>,
    pub form: Option<NameForm>,
    pub name_as_sort_order: Option<NameAsSortOrder>,
    /// Between family and given name in inverted order.
    pub sort_separator: Option<String>,
}

impl InheritableNameOptions {
    /// Fill unset options from `other`, the less specific level.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            and: self.and.or(other.and),
            delimiter: self.delimiter.clone().or_else(|| other.delimiter.clone()),
            delimiter_precedes_last: self.delimiter_precedes_last.or(other.delimiter_precedes_last),
            et_al_min: self.et_al_min.or(other.et_al_min),
            et_al_use_first: self.et_al_use_first.or(other.et_al_use_first),
            initialize_with: self
                .initialize_with
                .clone()
                .or_else(|| other.initialize_with.clone()),
            form: self.form.or(other.form),
            name_as_sort_order: self.name_as_sort_order.or(other.name_as_sort_order),
            sort_separator: self
                .sort_separator
                .clone()
                .or_else(|| other.sort_separator.clone()),
        }
    }
}

/// Which names are written family-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAsSortOrder {
    First,
    All,
}

/// Join the last two names with the locale's "and" term or with "&".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAnd {
    Text,
    Symbol,
}

/// Whether the name delimiter is also written before "and".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelimiterPrecedesLast {
    #[default]
    Contextual,
    Always,
    Never,
    AfterInvertedName,
}

/// `count` renders the number of names instead of the names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameForm {
    #[default]
    Long,
    Short,
    Count,
}

/// A rendering element plus the affix/font/case attributes written on it.
#[derive(Debug, Clone)]
pub struct Element {
    pub element_type: ElementType,
    pub formatting: Formatting,
}

#[derive(Debug, Clone)]
pub enum ElementType {
    Text(TextElement),
    Number(NumberElement),
    Label(LabelElement),
    Names(NamesElement),
    Date(DateElement),
    Group(GroupElement),
    Choose(ChooseElement),
}

#[derive(Debug, Clone)]
pub struct TextElement {
    pub source: TextSource,
}

/// Exactly one of `variable`, `macro`, `term`, or `value`.
#[derive(Debug, Clone)]
pub enum TextSource {
    Variable { name: String, form: VariableForm },
    Macro { name: String },
    Term { name: String, form: TermForm, plural: bool },
    Value { value: String },
}

/// `short` selects e.g. `container-title-short` when the record has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableForm {
    #[default]
    Long,
    Short,
}

#[derive(Debug, Clone)]
pub struct NumberElement {
    pub variable: String,
}

/// The term matching a number variable, e.g. "pp." before a page range.
#[derive(Debug, Clone)]
pub struct LabelElement {
    pub variable: String,
    pub form: TermForm,
    pub plural: LabelPlural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPlural {
    #[default]
    Contextual,
    Always,
    Never,
}

#[derive(Debug, Clone)]
pub struct NamesElement {
    /// Space-separated `variable` attribute, e.g. `["author"]`.
    pub variables: Vec<String>,
    pub name: InheritableNameOptions,
    pub name_formatting: Formatting,
    pub et_al: Option<EtAl>,
    /// Tried in order when every variable is empty. The first element that
    /// renders wins and its variables are not rendered again.
    pub substitute: Option<Vec<Element>>,
}

#[derive(Debug, Clone, Default)]
pub struct EtAl {
    /// Defaults to the "et-al" term.
    pub term: Option<String>,
    pub formatting: Formatting,
}

#[derive(Debug, Clone)]
pub struct DateElement {
    pub variable: String,
    /// Set for localized dates (`form="text"`/`"numeric"`); `None` means
    /// `parts` carries the full definition.
    pub form: Option<DateForm>,
    pub date_parts: DatePartsFilter,
    pub parts: Vec<DatePart>,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateForm {
    #[default]
    Text,
    Numeric,
}

/// The `date-parts` attribute of a localized date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatePartsFilter {
    Year,
    YearMonth,
    #[default]
    YearMonthDay,
}

#[derive(Debug, Clone)]
pub struct DatePart {
    pub name: DatePartName,
    pub form: Option<DatePartForm>,
    pub formatting: Formatting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePartName {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePartForm {
    Long,
    Short,
    Numeric,
    NumericLeadingZeros,
}

/// Children joined by `delimiter`; the whole group disappears when it
/// references variables and none of them render.
#[derive(Debug, Clone)]
pub struct GroupElement {
    pub elements: Vec<Element>,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChooseElement {
    /// `if`, then any `else-if`s, then an optional `else`.
    pub branches: Vec<ChooseBranch>,
}

#[derive(Debug, Clone)]
pub struct ChooseBranch {
    /// Empty for `<else>`, which always matches.
    pub conditions: Vec<Condition>,
    pub match_type: MatchType,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    All,
    Any,
    None,
}

/// One test from `<if>`/`<else-if>`. `type="book report"` becomes two
/// `Type` conditions combined by the branch's match type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Type(String),
    /// Holds when the record has a non-empty value.
    Variable(String),
    IsNumeric(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatting {
    pub font_style: Option<FontStyle>,
    pub font_weight: Option<FontWeight>,
    pub text_case: Option<TextCase>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub quotes: bool,
    pub strip_periods: bool,
}

impl Formatting {
    /// No attribute set, so the element renders without a wrapper.
    pub fn is_plain(&self) -> bool {
        *self == Formatting::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Lowercase,
    Uppercase,
    CapitalizeFirst,
    CapitalizeAll,
    Sentence,
    Title,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_self() {
        let specific = InheritableNameOptions {
            and: Some(NameAnd::Symbol),
            ..Default::default()
        };
        let general = InheritableNameOptions {
            and: Some(NameAnd::Text),
            initialize_with: Some(". ".to_string()),
            ..Default::default()
        };

        let merged = specific.merge(&general);
        assert_eq!(merged.and, Some(NameAnd::Symbol));
        assert_eq!(merged.initialize_with.as_deref(), Some(". "));
    }

    #[test]
    fn test_style_class_attribute_value() {
        assert_eq!(StyleClass::InText.as_str(), "in-text");
        assert_eq!(StyleClass::Note.as_str(), "note");
    }

    #[test]
    fn test_term_text_plural_fallback() {
        let term = Term {
            name: "page".to_string(),
            form: TermForm::Short,
            single: Some("p.".to_string()),
            multiple: Some("pp.".to_string()),
            value: None,
        };
        assert_eq!(term.text(false), Some("p."));
        assert_eq!(term.text(true), Some("pp."));

        let simple = Term {
            name: "and".to_string(),
            form: TermForm::Long,
            single: None,
            multiple: None,
            value: Some("and".to_string()),
        };
        assert_eq!(simple.text(true), Some("and"));
    }
}
