//! CSL parser that converts XML into typed [`Style`] values.

use crate::error::{Error, Result};
use crate::types::*;
use papervista_xml::{XmlAttribute, XmlElement};
use std::collections::{HashMap, HashSet};

/// Parse a CSL style from a string.
///
/// # Example
///
/// ```rust
/// use papervista_csl::parse_csl;
///
/// let csl = r#"<?xml version="1.0" encoding="utf-8"?>
/// <style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
///   <info><title>Test</title></info>
///   <citation><layout><text variable="title"/></layout></citation>
///   <bibliography><layout><text variable="title"/></layout></bibliography>
/// </style>"#;
///
/// let style = parse_csl(csl).unwrap();
/// assert_eq!(style.class, papervista_csl::StyleClass::InText);
/// assert!(style.bibliography.is_some());
/// ```
pub fn parse_csl(content: &str) -> Result<Style> {
    let xml = papervista_xml::parse(content)?;
    let style = CslParser::new().parse_style_element(&xml.root)?;

    validate_macros(&style)?;

    Ok(style)
}

/// Parse a standalone locale file (`<locale xml:lang="...">`).
pub fn parse_locale(content: &str) -> Result<Locale> {
    let xml = papervista_xml::parse(content)?;
    if xml.root.name != "locale" {
        return Err(Error::InvalidRootElement {
            found: xml.root.name.clone(),
        });
    }
    CslParser::new().parse_locale(&xml.root)
}

/// Validate all macro references in a style.
///
/// Every `<text macro="...">` must name a defined macro, and macros must not
/// reference themselves through any chain.
fn validate_macros(style: &Style) -> Result<()> {
    let macro_names: HashSet<&str> = style.macros.keys().map(|s| s.as_str()).collect();

    // Sort so the reported error does not depend on hash order
    let mut names: Vec<&String> = style.macros.keys().collect();
    names.sort();

    for name in names {
        if let Some(macro_def) = style.macros.get(name) {
            check_undefined_macros(&macro_def.elements, &macro_names)?;

            let mut visited = HashSet::new();
            let mut chain = vec![name.clone()];
            check_macro_cycle(name, &style.macros, &mut visited, &mut chain)?;
        }
    }

    check_undefined_macros(&style.citation.elements, &macro_names)?;
    if let Some(ref bib) = style.bibliography {
        check_undefined_macros(&bib.elements, &macro_names)?;
    }

    Ok(())
}

fn check_undefined_macros(elements: &[Element], defined: &HashSet<&str>) -> Result<()> {
    for name in collect_macro_refs(elements) {
        if !defined.contains(name.as_str()) {
            let suggestion = find_similar_macro(&name, defined);
            return Err(Error::UndefinedMacro { name, suggestion });
        }
    }
    Ok(())
}

/// Find the closest defined macro name, if it is within edit distance 3.
fn find_similar_macro(name: &str, defined: &HashSet<&str>) -> Option<String> {
    let name_lower = name.to_lowercase();
    let mut candidates: Vec<&str> = defined.iter().copied().collect();
    candidates.sort();

    candidates
        .into_iter()
        .map(|candidate| {
            let dist = levenshtein_distance(&name_lower, &candidate.to_lowercase());
            (candidate, dist)
        })
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(candidate, _)| candidate.to_string())
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Depth-first search for a macro that reaches itself.
fn check_macro_cycle(
    start: &str,
    macros: &HashMap<String, Macro>,
    visited: &mut HashSet<String>,
    chain: &mut Vec<String>,
) -> Result<()> {
    let Some(macro_def) = macros.get(start) else {
        return Ok(());
    };

    for ref_name in collect_macro_refs(&macro_def.elements) {
        if chain.contains(&ref_name) {
            chain.push(ref_name);
            return Err(Error::CircularMacro {
                chain: chain.clone(),
            });
        }

        if visited.insert(ref_name.clone()) {
            chain.push(ref_name.clone());
            check_macro_cycle(&ref_name, macros, visited, chain)?;
            chain.pop();
        }
    }

    Ok(())
}

/// Collect macro names referenced anywhere under `elements`, in document order.
fn collect_macro_refs(elements: &[Element]) -> Vec<String> {
    let mut refs = Vec::new();
    for element in elements {
        collect_macro_refs_from_element(element, &mut refs);
    }
    refs
}

fn collect_macro_refs_from_element(element: &Element, refs: &mut Vec<String>) {
    match &element.element_type {
        ElementType::Text(TextElement {
            source: TextSource::Macro { name },
        }) => refs.push(name.clone()),
        ElementType::Group(group) => {
            for el in &group.elements {
                collect_macro_refs_from_element(el, refs);
            }
        }
        ElementType::Choose(choose) => {
            for el in choose.branches.iter().flat_map(|b| &b.elements) {
                collect_macro_refs_from_element(el, refs);
            }
        }
        ElementType::Names(names) => {
            for el in names.substitute.iter().flatten() {
                collect_macro_refs_from_element(el, refs);
            }
        }
        _ => {}
    }
}

/// Internal CSL parser.
struct CslParser;

impl CslParser {
    fn new() -> Self {
        Self
    }

    fn parse_style_element(&self, element: &XmlElement) -> Result<Style> {
        if element.name != "style" {
            return Err(Error::InvalidRootElement {
                found: element.name.clone(),
            });
        }

        let version = self.require_attr(element, "version")?.value.clone();

        let class_attr = self.require_attr(element, "class")?;
        let class = match class_attr.value.as_str() {
            "in-text" => StyleClass::InText,
            "note" => StyleClass::Note,
            other => {
                return Err(Error::InvalidAttributeValue {
                    element: "style".to_string(),
                    attribute: "class".to_string(),
                    value: other.to_string(),
                    expected: "\"in-text\" or \"note\"".to_string(),
                });
            }
        };

        let default_locale = self
            .get_attr(element, "default-locale")
            .map(|a| a.value.clone());
        let name_options = self.parse_inheritable_name_options(element);

        let mut info = None;
        let mut locales = Vec::new();
        let mut macros: HashMap<String, Macro> = HashMap::new();
        let mut citation = None;
        let mut bibliography = None;

        for child in &element.children {
            match child.name.as_str() {
                "info" => info = Some(self.parse_info(child)),
                "locale" => locales.push(self.parse_locale(child)?),
                "macro" => {
                    let macro_def = self.parse_macro(child)?;
                    if macros.contains_key(&macro_def.name) {
                        return Err(Error::DuplicateMacro {
                            name: macro_def.name,
                        });
                    }
                    macros.insert(macro_def.name.clone(), macro_def);
                }
                "citation" => citation = Some(self.parse_layout(child)?),
                "bibliography" => bibliography = Some(self.parse_layout(child)?),
                _ => {}
            }
        }

        let citation = citation.ok_or_else(|| Error::MissingElement {
            parent: "style".to_string(),
            element: "citation".to_string(),
        })?;

        Ok(Style {
            version,
            class,
            default_locale,
            info,
            locales,
            macros,
            citation,
            bibliography,
            name_options,
        })
    }

    fn parse_info(&self, element: &XmlElement) -> StyleInfo {
        StyleInfo {
            title: element.child_text("title").map(str::to_string),
            id: element.child_text("id").map(str::to_string),
        }
    }

    fn parse_locale(&self, element: &XmlElement) -> Result<Locale> {
        let lang = element
            .attributes
            .iter()
            .find(|a| a.name == "lang" && a.prefix.as_deref() == Some("xml"))
            .map(|a| a.value.clone());

        let mut terms = Vec::new();
        let mut punctuation_in_quote = None;

        for child in &element.children {
            match child.name.as_str() {
                "terms" => {
                    for term_el in child.get_children("term") {
                        terms.push(self.parse_term(term_el)?);
                    }
                }
                "style-options" => {
                    punctuation_in_quote = self
                        .get_attr(child, "punctuation-in-quote")
                        .map(|a| a.value == "true");
                }
                _ => {}
            }
        }

        Ok(Locale {
            lang,
            terms,
            punctuation_in_quote,
        })
    }

    fn parse_term(&self, element: &XmlElement) -> Result<Term> {
        let name = self.require_attr(element, "name")?.value.clone();
        let form = self.parse_term_form(element);

        let mut single = None;
        let mut multiple = None;
        let mut value = None;

        if element.has_elements() {
            for child in &element.children {
                match child.name.as_str() {
                    "single" => single = Some(child.text.trim().to_string()),
                    "multiple" => multiple = Some(child.text.trim().to_string()),
                    _ => {}
                }
            }
        } else {
            // An empty <term/> explicitly blanks the term
            value = Some(element.text.trim().to_string());
        }

        Ok(Term {
            name,
            form,
            single,
            multiple,
            value,
        })
    }

    fn parse_term_form(&self, element: &XmlElement) -> TermForm {
        self.get_attr(element, "form")
            .map(|a| match a.value.as_str() {
                "short" => TermForm::Short,
                "verb" => TermForm::Verb,
                "verb-short" => TermForm::VerbShort,
                "symbol" => TermForm::Symbol,
                _ => TermForm::Long,
            })
            .unwrap_or_default()
    }

    fn parse_macro(&self, element: &XmlElement) -> Result<Macro> {
        let name = self.require_attr(element, "name")?.value.clone();
        let elements = self.parse_elements(element, "macro")?;

        Ok(Macro { name, elements })
    }

    fn parse_layout(&self, element: &XmlElement) -> Result<Layout> {
        let name_options = self.parse_inheritable_name_options(element);

        let layout_el = element.get_child("layout").ok_or_else(|| Error::MissingElement {
            parent: element.name.clone(),
            element: "layout".to_string(),
        })?;

        Ok(Layout {
            formatting: self.parse_formatting(layout_el),
            delimiter: self.get_attr(layout_el, "delimiter").map(|a| a.value.clone()),
            name_options,
            elements: self.parse_elements(layout_el, "layout")?,
        })
    }

    fn parse_inheritable_name_options(&self, element: &XmlElement) -> InheritableNameOptions {
        let mut options = self.parse_name_attributes(element);
        // On style/citation/bibliography the delimiter and form are prefixed
        options.delimiter = self
            .get_attr(element, "name-delimiter")
            .map(|a| a.value.clone());
        options.form = self
            .get_attr(element, "name-form")
            .map(|a| parse_name_form(&a.value));
        options
    }

    /// Name options shared by `<name>` and the inheritable levels.
    fn parse_name_attributes(&self, element: &XmlElement) -> InheritableNameOptions {
        let and = self
            .get_attr(element, "and")
            .map(|a| match a.value.as_str() {
                "symbol" => NameAnd::Symbol,
                _ => NameAnd::Text,
            });

        let delimiter_precedes_last =
            self.get_attr(element, "delimiter-precedes-last")
                .map(|a| match a.value.as_str() {
                    "always" => DelimiterPrecedesLast::Always,
                    "never" => DelimiterPrecedesLast::Never,
                    "after-inverted-name" => DelimiterPrecedesLast::AfterInvertedName,
                    _ => DelimiterPrecedesLast::Contextual,
                });

        let name_as_sort_order =
            self.get_attr(element, "name-as-sort-order")
                .map(|a| match a.value.as_str() {
                    "all" => NameAsSortOrder::All,
                    _ => NameAsSortOrder::First,
                });

        InheritableNameOptions {
            and,
            delimiter: self.get_attr(element, "delimiter").map(|a| a.value.clone()),
            delimiter_precedes_last,
            et_al_min: self
                .get_attr(element, "et-al-min")
                .and_then(|a| a.value.parse().ok()),
            et_al_use_first: self
                .get_attr(element, "et-al-use-first")
                .and_then(|a| a.value.parse().ok()),
            initialize_with: self
                .get_attr(element, "initialize-with")
                .map(|a| a.value.clone()),
            form: self.get_attr(element, "form").map(|a| parse_name_form(&a.value)),
            name_as_sort_order,
            sort_separator: self
                .get_attr(element, "sort-separator")
                .map(|a| a.value.clone()),
        }
    }

    fn parse_elements(&self, parent: &XmlElement, context: &str) -> Result<Vec<Element>> {
        parent
            .children
            .iter()
            .map(|child| self.parse_element(child, context))
            .collect()
    }

    fn parse_element(&self, element: &XmlElement, context: &str) -> Result<Element> {
        let element_type = match element.name.as_str() {
            "text" => ElementType::Text(self.parse_text_element(element)?),
            "number" => ElementType::Number(NumberElement {
                variable: self.require_attr(element, "variable")?.value.clone(),
            }),
            "label" => ElementType::Label(self.parse_label_element(element)?),
            "names" => ElementType::Names(self.parse_names_element(element)?),
            "date" => ElementType::Date(self.parse_date_element(element)?),
            "group" => ElementType::Group(GroupElement {
                delimiter: self.get_attr(element, "delimiter").map(|a| a.value.clone()),
                elements: self.parse_elements(element, "group")?,
            }),
            "choose" => ElementType::Choose(self.parse_choose_element(element)?),
            other => {
                return Err(Error::UnexpectedElement {
                    element: other.to_string(),
                    context: format!("<{}>", context),
                });
            }
        };

        Ok(Element {
            element_type,
            formatting: self.parse_formatting(element),
        })
    }

    fn parse_text_element(&self, element: &XmlElement) -> Result<TextElement> {
        let source = if let Some(attr) = self.get_attr(element, "variable") {
            let form = self
                .get_attr(element, "form")
                .map(|a| match a.value.as_str() {
                    "short" => VariableForm::Short,
                    _ => VariableForm::Long,
                })
                .unwrap_or_default();
            TextSource::Variable {
                name: attr.value.clone(),
                form,
            }
        } else if let Some(attr) = self.get_attr(element, "macro") {
            TextSource::Macro {
                name: attr.value.clone(),
            }
        } else if let Some(attr) = self.get_attr(element, "term") {
            TextSource::Term {
                name: attr.value.clone(),
                form: self.parse_term_form(element),
                plural: self
                    .get_attr(element, "plural")
                    .is_some_and(|a| a.value == "true"),
            }
        } else if let Some(attr) = self.get_attr(element, "value") {
            TextSource::Value {
                value: attr.value.clone(),
            }
        } else {
            return Err(Error::MissingTextSource);
        };

        Ok(TextElement { source })
    }

    fn parse_label_element(&self, element: &XmlElement) -> Result<LabelElement> {
        let variable = self.require_attr(element, "variable")?.value.clone();
        let plural = self
            .get_attr(element, "plural")
            .map(|a| match a.value.as_str() {
                "always" => LabelPlural::Always,
                "never" => LabelPlural::Never,
                _ => LabelPlural::Contextual,
            })
            .unwrap_or_default();

        Ok(LabelElement {
            variable,
            form: self.parse_term_form(element),
            plural,
        })
    }

    fn parse_names_element(&self, element: &XmlElement) -> Result<NamesElement> {
        let variables: Vec<String> = self
            .require_attr(element, "variable")?
            .value
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();

        let mut name = InheritableNameOptions::default();
        let mut name_formatting = Formatting::default();
        let mut et_al = None;
        let mut substitute = None;

        for child in &element.children {
            match child.name.as_str() {
                "name" => {
                    name = self.parse_name_attributes(child);
                    name_formatting = self.parse_formatting(child);
                }
                "et-al" => {
                    et_al = Some(EtAl {
                        term: self.get_attr(child, "term").map(|a| a.value.clone()),
                        formatting: self.parse_formatting(child),
                    });
                }
                "substitute" => substitute = Some(self.parse_elements(child, "substitute")?),
                _ => {}
            }
        }

        Ok(NamesElement {
            variables,
            name,
            name_formatting,
            et_al,
            substitute,
        })
    }

    fn parse_date_element(&self, element: &XmlElement) -> Result<DateElement> {
        let variable = self.require_attr(element, "variable")?.value.clone();

        let form = self
            .get_attr(element, "form")
            .map(|a| match a.value.as_str() {
                "numeric" => DateForm::Numeric,
                _ => DateForm::Text,
            });

        let date_parts = self
            .get_attr(element, "date-parts")
            .map(|a| match a.value.as_str() {
                "year" => DatePartsFilter::Year,
                "year-month" => DatePartsFilter::YearMonth,
                _ => DatePartsFilter::YearMonthDay,
            })
            .unwrap_or_default();

        let parts = element
            .get_children("date-part")
            .into_iter()
            .map(|child| self.parse_date_part(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(DateElement {
            variable,
            form,
            date_parts,
            parts,
            delimiter: self.get_attr(element, "delimiter").map(|a| a.value.clone()),
        })
    }

    fn parse_date_part(&self, element: &XmlElement) -> Result<DatePart> {
        let name_str = &self.require_attr(element, "name")?.value;
        let name = match name_str.as_str() {
            "year" => DatePartName::Year,
            "month" => DatePartName::Month,
            "day" => DatePartName::Day,
            _ => {
                return Err(Error::InvalidAttributeValue {
                    element: "date-part".to_string(),
                    attribute: "name".to_string(),
                    value: name_str.clone(),
                    expected: "\"year\", \"month\", or \"day\"".to_string(),
                });
            }
        };

        let form = self
            .get_attr(element, "form")
            .map(|a| match a.value.as_str() {
                "short" => DatePartForm::Short,
                "numeric" => DatePartForm::Numeric,
                "numeric-leading-zeros" => DatePartForm::NumericLeadingZeros,
                _ => DatePartForm::Long,
            });

        Ok(DatePart {
            name,
            form,
            formatting: self.parse_formatting(element),
        })
    }

    fn parse_choose_element(&self, element: &XmlElement) -> Result<ChooseElement> {
        let mut branches = Vec::new();

        for child in &element.children {
            match child.name.as_str() {
                "if" | "else-if" => branches.push(self.parse_choose_branch(child, false)?),
                "else" => branches.push(self.parse_choose_branch(child, true)?),
                other => {
                    return Err(Error::UnexpectedElement {
                        element: other.to_string(),
                        context: "<choose>".to_string(),
                    });
                }
            }
        }

        Ok(ChooseElement { branches })
    }

    fn parse_choose_branch(&self, element: &XmlElement, is_else: bool) -> Result<ChooseBranch> {
        let conditions = if is_else {
            Vec::new()
        } else {
            self.parse_conditions(element)
        };

        let match_type = self
            .get_attr(element, "match")
            .map(|a| match a.value.as_str() {
                "any" => MatchType::Any,
                "none" => MatchType::None,
                _ => MatchType::All,
            })
            .unwrap_or_default();

        Ok(ChooseBranch {
            conditions,
            match_type,
            elements: self.parse_elements(element, &element.name)?,
        })
    }

    fn parse_conditions(&self, element: &XmlElement) -> Vec<Condition> {
        let mut conditions = Vec::new();
        let tests: [(&str, fn(String) -> Condition); 3] = [
            ("type", Condition::Type),
            ("variable", Condition::Variable),
            ("is-numeric", Condition::IsNumeric),
        ];

        for (attribute, make) in tests {
            if let Some(attr) = self.get_attr(element, attribute) {
                conditions.extend(attr.value.split_whitespace().map(|v| make(v.to_string())));
            }
        }

        conditions
    }

    fn parse_formatting(&self, element: &XmlElement) -> Formatting {
        Formatting {
            font_style: self
                .get_attr(element, "font-style")
                .and_then(|a| match a.value.as_str() {
                    "italic" | "oblique" => Some(FontStyle::Italic),
                    "normal" => Some(FontStyle::Normal),
                    _ => None,
                }),
            font_weight: self.get_attr(element, "font-weight").and_then(|a| {
                match a.value.as_str() {
                    "bold" => Some(FontWeight::Bold),
                    "normal" | "light" => Some(FontWeight::Normal),
                    _ => None,
                }
            }),
            text_case: self
                .get_attr(element, "text-case")
                .and_then(|a| match a.value.as_str() {
                    "lowercase" => Some(TextCase::Lowercase),
                    "uppercase" => Some(TextCase::Uppercase),
                    "capitalize-first" => Some(TextCase::CapitalizeFirst),
                    "capitalize-all" => Some(TextCase::CapitalizeAll),
                    "sentence" => Some(TextCase::Sentence),
                    "title" => Some(TextCase::Title),
                    _ => None,
                }),
            prefix: self.get_attr(element, "prefix").map(|a| a.value.clone()),
            suffix: self.get_attr(element, "suffix").map(|a| a.value.clone()),
            quotes: self
                .get_attr(element, "quotes")
                .is_some_and(|a| a.value == "true"),
            strip_periods: self
                .get_attr(element, "strip-periods")
                .is_some_and(|a| a.value == "true"),
        }
    }

    // Helper methods

    fn require_attr<'a>(&self, element: &'a XmlElement, name: &str) -> Result<&'a XmlAttribute> {
        self.get_attr(element, name)
            .ok_or_else(|| Error::MissingAttribute {
                element: element.name.clone(),
                attribute: name.to_string(),
            })
    }

    fn get_attr<'a>(&self, element: &'a XmlElement, name: &str) -> Option<&'a XmlAttribute> {
        element
            .attributes
            .iter()
            .find(|a| a.name == name && a.prefix.is_none())
    }
}

fn parse_name_form(value: &str) -> NameForm {
    match value {
        "short" => NameForm::Short,
        "count" => NameForm::Count,
        _ => NameForm::Long,
    }
}
