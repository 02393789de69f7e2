use std::fmt;

use indexmap::IndexMap;
use rowan::TextRange;
use serde::Serialize;

use crate::source_map::SourceMap;

/// Diagnostic kinds grouped by category, in code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticKind {
    // Syntax
    UnexpectedToken,
    UnclosedDelimiter,
    InvalidLiteral,
    EmptyForm,
    NestingTooDeep,

    // Type
    UndefinedSymbol,
    NonBooleanCondition,
    BranchTypeMismatch,
    HeterogeneousArray,
    HeterogeneousMap,
    NonNumericOperand,
    NonBooleanOperand,
    EqualityOperandMismatch,
    NonNumericIndex,
    NotCallable,
    NotIndexable,
    ArgumentTypeMismatch,
    ReturnTypeMismatch,
    TypeMismatch,

    // Arity
    ArityMismatch,
    ArgumentCountMismatch,

    // Macro
    MalformedMacro,
    ReservedMacroName,
    DuplicateMacro,
    UnresolvedMacro,
    MacroRecursionLimit,

    // Record
    MalformedRecord,
    MalformedConstruction,
    RecordTypeMismatch,
    UnknownType,
    UnknownField,

    // Form
    MalformedDef,
    MalformedIf,
    MalformedFn,
    MalformedExport,
    MissingTypeAnnotation,
    MalformedFieldAccess,

    // Import / package
    MalformedImport,
    NotExported,
    PackageCycle,

    // Collection
    MalformedMap,

    // Symbol table
    DuplicateSymbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Syntax,
    Type,
    Arity,
    Macro,
    Record,
    Form,
    Import,
    Collection,
    Symbol,
}

impl Category {
    pub fn prefix(self) -> char {
        match self {
            Category::Syntax => 'S',
            Category::Type => 'T',
            Category::Arity => 'A',
            Category::Macro => 'M',
            Category::Record => 'R',
            Category::Form => 'F',
            Category::Import => 'P',
            Category::Collection => 'C',
            Category::Symbol => 'D',
        }
    }
}

impl DiagnosticKind {
    pub fn category(self) -> Category {
        use DiagnosticKind::*;
        match self {
            UnexpectedToken | UnclosedDelimiter | InvalidLiteral | EmptyForm | NestingTooDeep => {
                Category::Syntax
            }
            UndefinedSymbol | NonBooleanCondition | BranchTypeMismatch | HeterogeneousArray
            | HeterogeneousMap | NonNumericOperand | NonBooleanOperand
            | EqualityOperandMismatch | NonNumericIndex | NotCallable | NotIndexable
            | ArgumentTypeMismatch | ReturnTypeMismatch | TypeMismatch => Category::Type,
            ArityMismatch | ArgumentCountMismatch => Category::Arity,
            MalformedMacro | ReservedMacroName | DuplicateMacro | UnresolvedMacro
            | MacroRecursionLimit => Category::Macro,
            MalformedRecord | MalformedConstruction | RecordTypeMismatch | UnknownType
            | UnknownField => Category::Record,
            MalformedDef | MalformedIf | MalformedFn | MalformedExport | MissingTypeAnnotation
            | MalformedFieldAccess => Category::Form,
            MalformedImport | NotExported | PackageCycle => Category::Import,
            MalformedMap => Category::Collection,
            DuplicateSymbol => Category::Symbol,
        }
    }

    /// Stable code such as `T001`: category prefix plus 1-based position
    /// inside the category.
    pub fn code(self) -> String {
        let category = self.category();
        let index = ALL_KINDS
            .iter()
            .filter(|k| k.category() == category)
            .position(|k| *k == self)
            .map_or(0, |i| i + 1);
        format!("{}{:03}", category.prefix(), index)
    }

    pub fn default_severity(self) -> Severity {
        Severity::Error
    }

    /// Message template; `{name}` placeholders are filled from the
    /// diagnostic's parameters.
    pub fn template(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            UnexpectedToken => "unexpected `{token}`",
            UnclosedDelimiter => "missing closing `{delimiter}`",
            InvalidLiteral => "invalid literal `{text}`: {reason}",
            EmptyForm => "empty form `()` is not allowed",
            NestingTooDeep => "expression nested deeper than {limit} levels",

            UndefinedSymbol => "`{name}` is not defined",
            NonBooleanCondition => "`if` condition must be `bool`",
            BranchTypeMismatch => "`if` branches have incompatible types",
            HeterogeneousArray => "array elements must all have the same type",
            HeterogeneousMap => "map {part}s must all have the same type",
            NonNumericOperand => "operands of `{op}` must be numbers of one type",
            NonBooleanOperand => "operands of `{op}` must be `bool`",
            EqualityOperandMismatch => "operands of `{op}` must be comparable values of one type",
            NonNumericIndex => "`{op}` index must be `int`",
            NotCallable => "`{callee}` is not a function",
            NotIndexable => "`{op}` cannot be applied to this value",
            ArgumentTypeMismatch => "argument {position} of `{callee}` has the wrong type",
            ReturnTypeMismatch => "function body does not match its return type",
            TypeMismatch => "type mismatch",

            ArityMismatch => "`{form}` expects {expected_count} operand(s), found {found}",
            ArgumentCountMismatch => "`{callee}` expects {expected_count} argument(s), found {found}",

            MalformedMacro => "malformed macro definition: {reason}",
            ReservedMacroName => "`{name}` is reserved and cannot name a macro",
            DuplicateMacro => "macro `{name}` is already defined",
            UnresolvedMacro => "macro `{name}` is not defined",
            MacroRecursionLimit => "expanding `{name}` exceeded the depth limit of {limit}",

            MalformedRecord => "malformed record declaration: {reason}",
            MalformedConstruction => "malformed construction of `{record}`: {reason}",
            RecordTypeMismatch => "record type mismatch",
            UnknownType => "unknown type `{name}`",
            UnknownField => "record `{record}` has no field `{field}`",

            MalformedDef => "malformed `def`: {reason}",
            MalformedIf => "malformed `if`: {reason}",
            MalformedFn => "malformed `fn`: {reason}",
            MalformedExport => "malformed `export`: {reason}",
            MissingTypeAnnotation => "missing type annotation for {what}",
            MalformedFieldAccess => "malformed field access: {reason}",

            MalformedImport => "malformed `import`: {reason}",
            NotExported => "`{symbol}` is not exported by package `{package}`",
            PackageCycle => "circular package dependency: {chain}",

            MalformedMap => "malformed map literal: {reason}",

            DuplicateSymbol => "`{name}` is already defined in this scope",
        }
    }

    /// Hint attached when the call site does not provide one.
    pub fn default_hint(self) -> Option<&'static str> {
        use DiagnosticKind::*;
        match self {
            EmptyForm => Some("remove the empty parentheses or add an operator"),
            MissingTypeAnnotation => {
                Some("annotate parameters as `name: Type` and add `-> Type` before the body")
            }
            UnresolvedMacro => Some("define it with `(macro name! [params] body)` before use"),
            ReservedMacroName => Some("choose a name that does not shadow a special form"),
            NotExported => Some("add the name to the package's `(export ...)` form"),
            PackageCycle => Some("move the shared definitions into a package both can import"),
            MalformedMap => Some("write map literals as `(map [key value ...])`"),
            MalformedImport => Some("use `(import \"path\")` or `(import [[\"path\" alias]])`"),
            NonNumericIndex => Some("indices are `int` values"),
            _ => None,
        }
    }
}

const ALL_KINDS: &[DiagnosticKind] = {
    use DiagnosticKind::*;
    &[
        UnexpectedToken,
        UnclosedDelimiter,
        InvalidLiteral,
        EmptyForm,
        NestingTooDeep,
        UndefinedSymbol,
        NonBooleanCondition,
        BranchTypeMismatch,
        HeterogeneousArray,
        HeterogeneousMap,
        NonNumericOperand,
        NonBooleanOperand,
        EqualityOperandMismatch,
        NonNumericIndex,
        NotCallable,
        NotIndexable,
        ArgumentTypeMismatch,
        ReturnTypeMismatch,
        TypeMismatch,
        ArityMismatch,
        ArgumentCountMismatch,
        MalformedMacro,
        ReservedMacroName,
        DuplicateMacro,
        UnresolvedMacro,
        MacroRecursionLimit,
        MalformedRecord,
        MalformedConstruction,
        RecordTypeMismatch,
        UnknownType,
        UnknownField,
        MalformedDef,
        MalformedIf,
        MalformedFn,
        MalformedExport,
        MissingTypeAnnotation,
        MalformedFieldAccess,
        MalformedImport,
        NotExported,
        PackageCycle,
        MalformedMap,
        DuplicateSymbol,
    ]
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Position in an originating source file. Line and column are 1-based;
/// the column counts characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// A single structured diagnostic.
///
/// Built with chained setters at the detection site, then frozen. Spans are
/// offsets into the compilation unit; [`Diagnostic::locate`] turns them into
/// file positions once the unit's source map is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub(crate) kind: DiagnosticKind,
    pub(crate) severity: Severity,
    pub(crate) span: Option<TextRange>,
    pub(crate) location: Option<Location>,
    pub(crate) params: IndexMap<String, String>,
    pub(crate) suggestion: Option<String>,
}

const EXPECTED: &str = "expected";
const GOT: &str = "got";
const OFFENDER: &str = "offender";

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: TextRange) -> Self {
        Self {
            span: Some(span),
            ..Self::unspanned(kind)
        }
    }

    pub fn unspanned(kind: DiagnosticKind) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            span: None,
            location: None,
            params: IndexMap::new(),
            suggestion: kind.default_hint().map(str::to_string),
        }
    }

    pub fn param(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn expected(self, value: impl fmt::Display) -> Self {
        self.param(EXPECTED, value)
    }

    pub fn got(self, value: impl fmt::Display) -> Self {
        self.param(GOT, value)
    }

    pub fn offender(self, value: impl fmt::Display) -> Self {
        self.param(OFFENDER, value)
    }

    pub fn suggestion(mut self, text: impl Into<String>) -> Self {
        self.suggestion = Some(text.into());
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Resolve the span to a file position. Already located diagnostics
    /// are left alone.
    pub fn locate(mut self, map: &SourceMap) -> Self {
        if self.location.is_none()
            && let Some(span) = self.span
        {
            self.location = map.locate(span.start().into());
        }
        self
    }

    pub fn kind(&self) -> DiagnosticKind {
        self.kind
    }

    pub fn code(&self) -> String {
        self.kind.code()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn span(&self) -> Option<TextRange> {
        self.span
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn hint(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Template with parameters substituted.
    pub fn message(&self) -> String {
        fill_template(self.kind.template(), &self.params)
    }

    /// Plain-text rendering:
    /// `<location>: <severity>: [<code>]: <message>` plus optional
    /// `Expected:`, `Got:`, `Offender:` and `Suggestion:` lines.
    pub fn render_text(&self) -> String {
        let location = self
            .location
            .as_ref()
            .map_or_else(|| "<unknown>".to_string(), Location::to_string);
        let mut out = format!(
            "{location}: {}: [{}]: {}",
            self.severity,
            self.code(),
            self.message()
        );
        for (label, key) in [("Expected", EXPECTED), ("Got", GOT), ("Offender", OFFENDER)] {
            if let Some(value) = self.params.get(key) {
                out.push_str(&format!("\n  {label}: {value}"));
            }
        }
        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!("\n  Suggestion: {suggestion}"));
        }
        out
    }

    /// JSON rendering carrying the same fields as [`Diagnostic::render_text`].
    pub fn to_json(&self) -> serde_json::Value {
        let view = JsonDiagnostic {
            code: self.code(),
            category: self.kind.category(),
            kind: self.kind,
            severity: self.severity,
            location: self.location.as_ref(),
            template: self.kind.template(),
            message: self.message(),
            params: &self.params,
            suggestion: self.suggestion.as_deref(),
        };
        serde_json::to_value(view).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: String,
    category: Category,
    kind: DiagnosticKind,
    severity: Severity,
    location: Option<&'a Location>,
    template: &'static str,
    message: String,
    params: &'a IndexMap<String, String>,
    suggestion: Option<&'a str>,
}

fn fill_template(template: &str, params: &IndexMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if params.contains_key(&after[..close]) => {
                out.push_str(&params[&after[..close]]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}
