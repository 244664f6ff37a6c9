//! Bibliography entry evaluation.
//!
//! Walks a style's `<bibliography>` layout for one record and produces an
//! [`Output`] tree. Every element also reports whether it referenced a
//! variable and whether any referenced variable rendered, so that groups can
//! be suppressed when all of their variables are empty.

use crate::error::{Result, RulesFailure};
use crate::locale::LocaleManager;
use crate::output::{Output, join_outputs};
use crate::record::{CanonicalCitationRecord, PersonName};
use papervista_csl::{
    ChooseElement, Condition, DateElement, DateForm, DatePartForm, DatePartName,
    DatePartsFilter, DelimiterPrecedesLast, Element, ElementType, EtAl,
    GroupElement, InheritableNameOptions, LabelElement, LabelPlural, MatchType, NameAnd,
    NameAsSortOrder, NameForm, NamesElement, Style, TermForm, TextSource,
};
use std::collections::HashSet;

/// Macro nesting deeper than this is treated as a malformed style.
const MAX_MACRO_DEPTH: usize = 64;

/// Variable usage of an evaluated element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct VarStatus {
    /// Some variable was referenced.
    called: bool,
    /// Some referenced variable produced output.
    rendered: bool,
}

impl VarStatus {
    fn variable(rendered: bool) -> Self {
        Self {
            called: true,
            rendered,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            called: self.called || other.called,
            rendered: self.rendered || other.rendered,
        }
    }
}

/// Evaluation context for processing a single record.
struct EvalContext<'a> {
    style: &'a Style,
    locale: &'a LocaleManager,
    record: &'a CanonicalCitationRecord,
    /// Name options inherited from the style and layout.
    inherited: InheritableNameOptions,
    /// Variables consumed by a `<substitute>`; they render empty afterwards.
    suppressed: HashSet<String>,
    depth: usize,
}

impl EvalContext<'_> {
    fn get_term(&self, name: &str, form: TermForm, plural: bool) -> Option<String> {
        self.locale.get_term(name, form, plural)
    }

    fn variable(&self, name: &str) -> Option<&str> {
        if self.suppressed.contains(name) {
            return None;
        }
        self.record.variable(name)
    }

    fn names(&self, name: &str) -> &[PersonName] {
        if self.suppressed.contains(name) {
            return &[];
        }
        self.record.names(name)
    }
}

/// Evaluate the style's bibliography layout for `record`.
pub(crate) fn evaluate_bibliography_entry(
    style: &Style,
    locale: &LocaleManager,
    record: &CanonicalCitationRecord,
) -> Result<Output> {
    let layout = style.bibliography.as_ref().ok_or_else(|| {
        RulesFailure::ProcessingError("style defines no bibliography layout".to_string())
    })?;

    let mut ctx = EvalContext {
        style,
        locale,
        record,
        inherited: layout.name_options.merge(&style.name_options),
        suppressed: HashSet::new(),
        depth: 0,
    };

    let (output, _) = evaluate_elements(&mut ctx, &layout.elements, "")?;
    Ok(Output::formatted(layout.formatting.clone(), vec![output]))
}

/// Evaluate a sequence of elements.
fn evaluate_elements(
    ctx: &mut EvalContext,
    elements: &[Element],
    delimiter: &str,
) -> Result<(Output, VarStatus)> {
    let mut outputs = Vec::with_capacity(elements.len());
    let mut status = VarStatus::default();

    for element in elements {
        let (output, element_status) = evaluate_element(ctx, element)?;
        status = status.merge(element_status);
        outputs.push(output);
    }

    Ok((join_outputs(outputs, delimiter), status))
}

/// Evaluate a single element.
fn evaluate_element(ctx: &mut EvalContext, element: &Element) -> Result<(Output, VarStatus)> {
    let (output, status) = match &element.element_type {
        ElementType::Text(text) => evaluate_text(ctx, &text.source)?,
        ElementType::Number(number) => {
            match ctx.variable(&number.variable) {
                Some(value) => (
                    Output::literal(format_variable(&number.variable, value)),
                    VarStatus::variable(true),
                ),
                None => (Output::Null, VarStatus::variable(false)),
            }
        }
        ElementType::Label(label) => (evaluate_label(ctx, label), VarStatus::default()),
        ElementType::Names(names) => evaluate_names(ctx, names)?,
        ElementType::Date(date) => {
            let output = evaluate_date(ctx, date);
            let rendered = !output.is_null();
            (output, VarStatus::variable(rendered))
        }
        ElementType::Group(group) => evaluate_group(ctx, group)?,
        ElementType::Choose(choose) => evaluate_choose(ctx, choose)?,
    };

    Ok((Output::formatted(element.formatting.clone(), vec![output]), status))
}

/// Evaluate a text element.
fn evaluate_text(ctx: &mut EvalContext, source: &TextSource) -> Result<(Output, VarStatus)> {
    match source {
        TextSource::Variable { name, .. } => {
            let Some(value) = ctx.variable(name) else {
                return Ok((Output::Null, VarStatus::variable(false)));
            };
            let output = if name.eq_ignore_ascii_case("url") {
                Output::linked(value, vec![Output::literal(value)])
            } else {
                Output::literal(format_variable(name, value))
            };
            Ok((output, VarStatus::variable(true)))
        }
        TextSource::Macro { name } => {
            let style = ctx.style;
            let macro_def = style.macros.get(name).ok_or_else(|| {
                RulesFailure::ProcessingError(format!("undefined macro '{}'", name))
            })?;
            if ctx.depth >= MAX_MACRO_DEPTH {
                return Err(RulesFailure::ProcessingError(format!(
                    "macro '{}' nests too deeply",
                    name
                )));
            }
            ctx.depth += 1;
            let result = evaluate_elements(ctx, &macro_def.elements, "");
            ctx.depth -= 1;
            result
        }
        TextSource::Term { name, form, plural } => {
            let output = ctx
                .get_term(name, *form, *plural)
                .map(Output::literal)
                .unwrap_or(Output::Null);
            Ok((output, VarStatus::default()))
        }
        TextSource::Value { value } => Ok((Output::literal(value.clone()), VarStatus::default())),
    }
}

/// Variable text with per-variable conventions (page ranges use an en dash).
fn format_variable(name: &str, value: &str) -> String {
    if name == "page" {
        page_range(value)
    } else {
        value.to_string()
    }
}

/// Replace each run of hyphens with a single en dash.
fn page_range(pages: &str) -> String {
    let mut out = String::with_capacity(pages.len());
    let mut in_run = false;
    for c in pages.chars() {
        if c == '-' {
            if !in_run {
                out.push('–');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// True if the value contains more than one number (a range or a list).
fn is_plural_value(value: &str) -> bool {
    numeric_tokens(value).is_some_and(|tokens| tokens.len() > 1)
}

/// CSL is-numeric: one or more numbers joined by `-`, `–`, `,`, or `&`.
fn is_numeric(value: &str) -> bool {
    numeric_tokens(value).is_some()
}

fn numeric_tokens(value: &str) -> Option<Vec<&str>> {
    let tokens: Vec<&str> = value
        .split(['-', '–', ',', '&'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    let numeric = !tokens.is_empty() && tokens.iter().all(|t| t.chars().all(|c| c.is_ascii_digit()));
    numeric.then_some(tokens)
}

/// Evaluate a label element.
fn evaluate_label(ctx: &EvalContext, label: &LabelElement) -> Output {
    let Some(value) = ctx.variable(&label.variable) else {
        return Output::Null;
    };

    let plural = match label.plural {
        LabelPlural::Always => true,
        LabelPlural::Never => false,
        LabelPlural::Contextual => is_plural_value(value),
    };

    ctx.get_term(&label.variable, label.form, plural)
        .map(Output::literal)
        .unwrap_or(Output::Null)
}

/// Evaluate a names element.
fn evaluate_names(ctx: &mut EvalContext, names_el: &NamesElement) -> Result<(Output, VarStatus)> {
    let options = names_el.name.merge(&ctx.inherited);

    let mut lists = Vec::new();
    for var in &names_el.variables {
        let names = ctx.names(var);
        if !names.is_empty() {
            lists.push(format_names(ctx, names, &options, names_el.et_al.as_ref()));
        }
    }

    if !lists.is_empty() {
        let names = Output::formatted(names_el.name_formatting.clone(), vec![join_outputs(lists, ", ")]);
        return Ok((names, VarStatus::variable(true)));
    }

    // No names: the first substitute element that renders replaces them
    if let Some(substitute) = &names_el.substitute {
        for element in substitute {
            let (output, _) = evaluate_element(ctx, element)?;
            if !output.is_null() {
                for var in substituted_variables(element) {
                    ctx.suppressed.insert(var);
                }
                return Ok((output, VarStatus::variable(true)));
            }
        }
    }

    Ok((Output::Null, VarStatus::variable(false)))
}

/// Variables directly rendered by a substitute element.
fn substituted_variables(element: &Element) -> Vec<String> {
    match &element.element_type {
        ElementType::Text(text) => match &text.source {
            TextSource::Variable { name, .. } => vec![name.clone()],
            _ => Vec::new(),
        },
        ElementType::Names(names) => names.variables.clone(),
        ElementType::Number(number) => vec![number.variable.clone()],
        _ => Vec::new(),
    }
}

/// Format a list of names according to CSL rules.
fn format_names(
    ctx: &EvalContext,
    names: &[PersonName],
    options: &InheritableNameOptions,
    et_al: Option<&EtAl>,
) -> Output {
    let delimiter = options.delimiter.as_deref().unwrap_or(", ");
    let total = names.len();

    let truncated = match (options.et_al_min, options.et_al_use_first) {
        (Some(min), use_first) => {
            let use_first = use_first.unwrap_or(1).max(1) as usize;
            total >= min as usize && use_first < total
        }
        _ => false,
    };
    let shown = if truncated {
        options.et_al_use_first.unwrap_or(1).max(1) as usize
    } else {
        total
    };

    if options.form == Some(NameForm::Count) {
        return Output::literal(shown.to_string());
    }

    let formatted: Vec<String> = names
        .iter()
        .take(shown)
        .enumerate()
        .map(|(i, name)| format_single_name(name, options, i))
        .collect();

    let and_word = options.and.map(|and| match and {
        NameAnd::Text => ctx
            .get_term("and", TermForm::Long, false)
            .unwrap_or_else(|| "and".to_string()),
        NameAnd::Symbol => "&".to_string(),
    });

    let mut list = match (formatted.split_last(), &and_word) {
        (Some((last, head)), Some(and)) if !head.is_empty() && !truncated => {
            let inverted_before_last = is_inverted(options, head.len() - 1);
            let use_delimiter = match options.delimiter_precedes_last.unwrap_or_default() {
                DelimiterPrecedesLast::Contextual => formatted.len() >= 3,
                DelimiterPrecedesLast::Always => true,
                DelimiterPrecedesLast::Never => false,
                DelimiterPrecedesLast::AfterInvertedName => inverted_before_last,
            };
            let joiner = if use_delimiter { delimiter } else { " " };
            format!("{}{}{} {}", head.join(delimiter), joiner, and, last)
        }
        _ => formatted.join(delimiter),
    };

    let mut parts = Vec::new();
    if truncated {
        let term_name = et_al.and_then(|e| e.term.as_deref()).unwrap_or("et-al");
        let term = ctx
            .get_term(term_name, TermForm::Long, false)
            .unwrap_or_else(|| "et al.".to_string());
        // Contextual: the delimiter precedes et-al only after two or more names
        list.push_str(if shown >= 2 { delimiter } else { " " });
        parts.push(Output::literal(list));
        let formatting = et_al.map(|e| e.formatting.clone()).unwrap_or_default();
        parts.push(Output::formatted(formatting, vec![Output::literal(term)]));
    } else {
        parts.push(Output::literal(list));
    }

    Output::sequence(parts)
}

fn is_inverted(options: &InheritableNameOptions, index: usize) -> bool {
    match options.name_as_sort_order {
        Some(NameAsSortOrder::All) => true,
        Some(NameAsSortOrder::First) => index == 0,
        None => false,
    }
}

/// Format a single name.
fn format_single_name(name: &PersonName, options: &InheritableNameOptions, index: usize) -> String {
    if options.form == Some(NameForm::Short) {
        return name.family.clone();
    }

    let given = name.given.as_deref().map(|given| match &options.initialize_with {
        Some(init) => initialize_name(given, init),
        None => given.to_string(),
    });

    match given.filter(|g| !g.is_empty()) {
        None => name.family.clone(),
        Some(given) if is_inverted(options, index) => {
            let sort_separator = options.sort_separator.as_deref().unwrap_or(", ");
            format!("{}{}{}", name.family, sort_separator, given)
        }
        Some(given) => format!("{} {}", given, name.family),
    }
}

/// Initialize a given name (e.g., "John William" -> "J. W.", "Jean-Paul" -> "J.-P.").
fn initialize_name(given: &str, initialize_with: &str) -> String {
    let mark = initialize_with.trim_end();
    let spacer = if initialize_with.ends_with(' ') { " " } else { "" };

    given
        .split_whitespace()
        .map(|word| {
            word.split('-')
                .filter_map(|part| part.chars().find(|c| c.is_alphabetic()))
                .map(|c| format!("{}{}", c.to_uppercase(), mark))
                .collect::<Vec<_>>()
                .join("-")
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(spacer)
}

/// Evaluate a date element.
fn evaluate_date(ctx: &EvalContext, date_el: &DateElement) -> Output {
    let Some(parts) = ctx.record.date(&date_el.variable) else {
        return Output::Null;
    };

    let year = parts.first().copied();
    let month = parts.get(1).copied().filter(|m| (1..=12).contains(m));
    let day = parts.get(2).copied().filter(|d| (1..=31).contains(d));

    let Some(year) = year else {
        return Output::Null;
    };

    if let Some(form) = date_el.form {
        let month = month.filter(|_| date_el.date_parts != DatePartsFilter::Year);
        let day = day.filter(|_| date_el.date_parts == DatePartsFilter::YearMonthDay);
        return Output::literal(localized_date(ctx, form, year, month, day));
    }

    if date_el.parts.is_empty() {
        return Output::literal(year.to_string());
    }

    let outputs = date_el
        .parts
        .iter()
        .map(|part| {
            let value = match part.name {
                DatePartName::Year => Some(year.to_string()),
                DatePartName::Month => month.and_then(|m| {
                    format_month(ctx, m, part.form.unwrap_or(DatePartForm::Long))
                }),
                DatePartName::Day => {
                    day.map(|d| format_day(d, part.form.unwrap_or(DatePartForm::Numeric)))
                }
            };
            value
                .map(|v| Output::formatted(part.formatting.clone(), vec![Output::literal(v)]))
                .unwrap_or(Output::Null)
        })
        .collect();

    join_outputs(outputs, date_el.delimiter.as_deref().unwrap_or(""))
}

/// en-US localized date forms.
fn localized_date(
    ctx: &EvalContext,
    form: DateForm,
    year: i32,
    month: Option<i32>,
    day: Option<i32>,
) -> String {
    match form {
        DateForm::Text => {
            let month_name = month.and_then(|m| format_month(ctx, m, DatePartForm::Long));
            match (month_name, day) {
                (Some(m), Some(d)) => format!("{} {}, {}", m, d, year),
                (Some(m), None) => format!("{} {}", m, year),
                (None, _) => year.to_string(),
            }
        }
        DateForm::Numeric => match (month, day) {
            (Some(m), Some(d)) => format!("{}/{}/{}", m, d, year),
            (Some(m), None) => format!("{}/{}", m, year),
            (None, _) => year.to_string(),
        },
    }
}

fn format_month(ctx: &EvalContext, month: i32, form: DatePartForm) -> Option<String> {
    let term_name = format!("month-{:02}", month);
    match form {
        DatePartForm::Long => ctx.get_term(&term_name, TermForm::Long, false),
        DatePartForm::Short => ctx.get_term(&term_name, TermForm::Short, false),
        DatePartForm::Numeric => Some(month.to_string()),
        DatePartForm::NumericLeadingZeros => Some(format!("{:02}", month)),
    }
}

fn format_day(day: i32, form: DatePartForm) -> String {
    match form {
        DatePartForm::NumericLeadingZeros => format!("{:02}", day),
        _ => day.to_string(),
    }
}

/// Evaluate a group element, suppressing it when every variable it calls is empty.
fn evaluate_group(ctx: &mut EvalContext, group: &GroupElement) -> Result<(Output, VarStatus)> {
    let delimiter = group.delimiter.as_deref().unwrap_or("");
    let (output, status) = evaluate_elements(ctx, &group.elements, delimiter)?;

    if status.called && !status.rendered {
        return Ok((Output::Null, status));
    }
    Ok((output, status))
}

/// Evaluate a choose element (conditionals).
fn evaluate_choose(ctx: &mut EvalContext, choose: &ChooseElement) -> Result<(Output, VarStatus)> {
    for branch in &choose.branches {
        let results: Vec<bool> = branch
            .conditions
            .iter()
            .map(|c| evaluate_condition(ctx, c))
            .collect();
        // An <else> branch has no conditions
        let matches = results.is_empty()
            || match branch.match_type {
                MatchType::All => results.iter().all(|m| *m),
                MatchType::Any => results.iter().any(|m| *m),
                MatchType::None => results.iter().all(|m| !*m),
            };

        if matches {
            return evaluate_elements(ctx, &branch.elements, "");
        }
    }

    Ok((Output::Null, VarStatus::default()))
}

/// Evaluate a condition.
fn evaluate_condition(ctx: &EvalContext, condition: &Condition) -> bool {
    match condition {
        Condition::Type(kind) => ctx.record.kind.as_str() == kind,
        Condition::Variable(var) => {
            ctx.variable(var).is_some()
                || !ctx.names(var).is_empty()
                || ctx.record.date(var).is_some()
        }
        Condition::IsNumeric(var) => ctx.variable(var).is_some_and(is_numeric),
    }
}
