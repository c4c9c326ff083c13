//! Line-oriented text format for accounts and entry indexes.
//!
//! Every record sits on one line: a marker followed by a brace-delimited body.
//! Strings are JSON-escaped, so descriptions may hold quotes, markers, or line
//! breaks without splitting a record.

use std::{collections::BTreeMap, fmt, ops::Range, str::FromStr};

use rust_decimal::Decimal;

use crate::{
    errors::{LedgerError, Result},
    ledger::{Account, BudgetPeriod, Entry, EntryFields, EntryIndex, Period},
};

pub const ACCOUNT_MARKER: &str = "ACCOUNTx";
pub const INDEX_MARKER: &str = "FLOWSx";

/// Which side of the cash flow an encoded index holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inflow,
    Outflow,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inflow => "inflow",
            Direction::Outflow => "outflow",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "inflow" => Ok(Direction::Inflow),
            "outflow" => Ok(Direction::Outflow),
            other => Err(LedgerError::invalid("direction", other)),
        }
    }
}

/// Everything a saved working session holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub accounts: Vec<Account>,
    pub inflows: EntryIndex,
    pub outflows: EntryIndex,
}

/// A record `decode_lenient` skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub record: usize,
    pub span: Range<usize>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LenientDecode {
    pub accounts: Vec<Account>,
    pub dropped: Vec<DroppedRecord>,
}

pub fn encode(accounts: &[Account]) -> String {
    let mut out = String::new();
    for account in accounts {
        write_account(&mut out, account);
        out.push('\n');
    }
    out
}

/// Decodes every account record of `text`. Index records are skipped.
pub fn decode(text: &str) -> Result<Vec<Account>> {
    let mut accounts = Vec::new();
    for raw in split_records(text) {
        match parse_record(&raw).map_err(|reason| raw.corrupt(reason))? {
            Record::Account(account) => accounts.push(account),
            Record::Index(direction, _) => {
                tracing::debug!(record = raw.number, %direction, "skipping index record");
            }
        }
    }
    Ok(accounts)
}

/// Like [`decode`], but drops malformed records instead of failing.
pub fn decode_lenient(text: &str) -> LenientDecode {
    let mut decoded = LenientDecode::default();
    for raw in split_records(text) {
        match parse_record(&raw) {
            Ok(Record::Account(account)) => decoded.accounts.push(account),
            Ok(Record::Index(..)) => {}
            Err(reason) => {
                tracing::warn!(
                    record = raw.number,
                    start = raw.span.start,
                    end = raw.span.end,
                    %reason,
                    "dropping corrupt record"
                );
                decoded.dropped.push(DroppedRecord {
                    record: raw.number,
                    span: raw.span.clone(),
                    reason,
                });
            }
        }
    }
    decoded
}

pub fn encode_index(index: &EntryIndex, direction: Direction) -> String {
    let mut out = String::new();
    write_index(&mut out, index, direction);
    out.push('\n');
    out
}

/// Accounts first, then the inflow and outflow indexes.
pub fn encode_session(session: &Session) -> String {
    let mut out = encode(&session.accounts);
    write_index(&mut out, &session.inflows, Direction::Inflow);
    out.push('\n');
    write_index(&mut out, &session.outflows, Direction::Outflow);
    out.push('\n');
    out
}

pub fn decode_session(text: &str) -> Result<Session> {
    let mut session = Session::default();
    let mut seen = Vec::new();
    for raw in split_records(text) {
        match parse_record(&raw).map_err(|reason| raw.corrupt(reason))? {
            Record::Account(account) => session.accounts.push(account),
            Record::Index(direction, index) => {
                if seen.contains(&direction) {
                    return Err(raw.corrupt(format!("duplicate {direction} index")));
                }
                seen.push(direction);
                match direction {
                    Direction::Inflow => session.inflows = index,
                    Direction::Outflow => session.outflows = index,
                }
            }
        }
    }
    tracing::debug!(
        accounts = session.accounts.len(),
        inflows = session.inflows.len(),
        outflows = session.outflows.len(),
        "decoded session"
    );
    Ok(session)
}

fn write_account(out: &mut String, account: &Account) {
    out.push_str(ACCOUNT_MARKER);
    out.push_str("{\"budgets\": {");
    let mut current_year = None;
    for (period, budget) in account.periods() {
        if current_year != Some(period.year) {
            if current_year.is_some() {
                out.push_str("}, ");
            }
            out.push_str(&period.year.to_string());
            out.push_str(": {");
            current_year = Some(period.year);
        } else {
            out.push_str(", ");
        }
        out.push_str(&period.month.to_string());
        out.push_str(": ");
        write_budget(out, budget);
    }
    if current_year.is_some() {
        out.push('}');
    }
    out.push_str("}, \"name\": ");
    write_string(out, account.name());
    out.push_str(", \"is_saving\": ");
    match account.is_saving() {
        Some(flag) => out.push_str(if flag { "true" } else { "false" }),
        None => out.push_str("null"),
    }
    out.push('}');
}

fn write_budget(out: &mut String, budget: &BudgetPeriod) {
    out.push_str("{\"acct_entries\": ");
    write_entries(out, budget.entries());
    out.push_str(", \"goal\": ");
    write_optional(out, budget.goal());
    out.push_str(", \"reached\": ");
    write_optional(out, budget.reached());
    out.push_str(", \"remaining\": ");
    write_optional(out, budget.remaining());
    out.push_str(", \"percent_remaining\": ");
    out.push_str(&budget.percent_remaining().to_string());
    out.push_str(", \"percent_reached\": ");
    out.push_str(&budget.percent_reached().to_string());
    out.push('}');
}

fn write_index(out: &mut String, index: &EntryIndex, direction: Direction) {
    out.push_str(INDEX_MARKER);
    out.push_str("{\"direction\": ");
    write_string(out, direction.as_str());
    out.push_str(", \"periods\": {");
    let mut current_year = None;
    for (period, entries) in index.iter_periods() {
        if current_year != Some(period.year) {
            if current_year.is_some() {
                out.push_str("}, ");
            }
            out.push_str(&period.year.to_string());
            out.push_str(": {");
            current_year = Some(period.year);
        } else {
            out.push_str(", ");
        }
        out.push_str(&period.month.to_string());
        out.push_str(": ");
        write_entries(out, entries);
    }
    if current_year.is_some() {
        out.push('}');
    }
    out.push_str("}, \"total\": ");
    out.push_str(&index.total().to_string());
    out.push('}');
}

fn write_entries(out: &mut String, entries: &[Entry]) {
    out.push('[');
    for (idx, entry) in entries.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        write_entry(out, entry);
    }
    out.push(']');
}

fn write_entry(out: &mut String, entry: &Entry) {
    out.push_str("{\"year\": ");
    out.push_str(&entry.year().to_string());
    out.push_str(", \"month\": ");
    out.push_str(&entry.month().to_string());
    out.push_str(", \"day\": ");
    out.push_str(&entry.day().to_string());
    out.push_str(", \"account_name\": ");
    write_string(out, entry.account_name());
    out.push_str(", \"description\": ");
    write_string(out, entry.description());
    out.push_str(", \"is_inflow\": ");
    out.push_str(if entry.is_inflow() { "true" } else { "false" });
    out.push_str(", \"currency\": ");
    write_string(out, entry.currency());
    out.push_str(", \"amount\": ");
    out.push_str(&entry.amount().to_string());
    out.push('}');
}

fn write_optional(out: &mut String, value: Option<i64>) {
    match value {
        Some(value) => out.push_str(&value.to_string()),
        None => out.push_str("null"),
    }
}

fn write_string(out: &mut String, value: &str) {
    out.push_str(&serde_json::Value::from(value).to_string());
}

/// One non-blank line of input.
struct RawRecord<'a> {
    number: usize,
    span: Range<usize>,
    body: &'a str,
}

impl RawRecord<'_> {
    fn corrupt(&self, reason: String) -> LedgerError {
        LedgerError::CorruptRecord {
            record: self.number,
            span: self.span.clone(),
            reason,
        }
    }
}

fn split_records(text: &str) -> Vec<RawRecord<'_>> {
    let mut records = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let body = line.trim_end_matches(&['\n', '\r'][..]);
        if body.trim().is_empty() {
            continue;
        }
        records.push(RawRecord {
            number: records.len() + 1,
            span: start..start + body.len(),
            body,
        });
    }
    records
}

enum Record {
    Account(Account),
    Index(Direction, EntryIndex),
}

type Parsed<T> = std::result::Result<T, String>;

fn parse_record(raw: &RawRecord<'_>) -> Parsed<Record> {
    if let Some(body) = raw.body.strip_prefix(ACCOUNT_MARKER) {
        let value = parse_body(body, raw.span.start + ACCOUNT_MARKER.len())?;
        return account_from_value(value).map(Record::Account);
    }
    if let Some(body) = raw.body.strip_prefix(INDEX_MARKER) {
        let value = parse_body(body, raw.span.start + INDEX_MARKER.len())?;
        return index_from_value(value).map(|(direction, index)| Record::Index(direction, index));
    }
    Err("unknown record marker".to_string())
}

fn account_from_value(value: Value<'_>) -> Parsed<Account> {
    let mut fields = value.into_map("account")?;
    let name = take(&mut fields, "name")?.into_string("name")?;
    let is_saving = take(&mut fields, "is_saving")?.into_optional_bool("is_saving")?;
    let budgets = take(&mut fields, "budgets")?.into_map("budgets")?;

    let mut periods = BTreeMap::new();
    for (period, value) in periods_of(budgets)? {
        let mut budget = value.into_map("budget")?;
        let entries = take(&mut budget, "acct_entries")?.into_entries("acct_entries")?;
        let goal = take(&mut budget, "goal")?.into_optional_i64("goal")?;
        let reached = take(&mut budget, "reached")?.into_optional_i64("reached")?;
        let remaining = take(&mut budget, "remaining")?.into_optional_i64("remaining")?;
        let percent_remaining =
            take(&mut budget, "percent_remaining")?.into_decimal("percent_remaining")?;
        let percent_reached =
            take(&mut budget, "percent_reached")?.into_decimal("percent_reached")?;
        periods.insert(
            period,
            BudgetPeriod::from_parts(
                entries,
                goal,
                reached,
                remaining,
                percent_remaining,
                percent_reached,
            ),
        );
    }
    Account::from_parts(name, is_saving, periods).map_err(|err| err.to_string())
}

fn index_from_value(value: Value<'_>) -> Parsed<(Direction, EntryIndex)> {
    let mut fields = value.into_map("index")?;
    let direction = take(&mut fields, "direction")?
        .into_string("direction")?
        .parse::<Direction>()
        .map_err(|err| err.to_string())?;
    let total = take(&mut fields, "total")?.into_i64("total")?;
    let mut by_period = BTreeMap::new();
    for (period, value) in periods_of(take(&mut fields, "periods")?.into_map("periods")?)? {
        let entries = value.into_entries("periods")?;
        if let Some(misfiled) = entries.iter().find(|entry| entry.period() != period) {
            return Err(format!(
                "entry dated {} filed under {}",
                misfiled.period(),
                period
            ));
        }
        by_period.insert(period, entries);
    }
    Ok((direction, EntryIndex::from_parts(by_period, total)))
}

/// Flattens a `{YEAR: {MONTH: value}}` map, rejecting repeated periods.
fn periods_of(years: Vec<(String, Value<'_>)>) -> Parsed<Vec<(Period, Value<'_>)>> {
    let mut flat: Vec<(Period, Value<'_>)> = Vec::new();
    for (year_key, months) in years {
        let year: i32 = year_key
            .parse()
            .map_err(|_| format!("invalid year key `{year_key}`"))?;
        for (month_key, value) in months.into_map("months")? {
            let month: u32 = month_key
                .parse()
                .map_err(|_| format!("invalid month key `{month_key}`"))?;
            let period = Period::new(year, month).map_err(|err| err.to_string())?;
            if flat.iter().any(|(seen, _)| *seen == period) {
                return Err(format!("duplicate period {period}"));
            }
            flat.push((period, value));
        }
    }
    Ok(flat)
}

fn entry_from_value(value: Value<'_>) -> Parsed<Entry> {
    let mut fields = value.into_map("entry")?;
    let raw = EntryFields {
        year: take(&mut fields, "year")?.into_number("year")?,
        month: take(&mut fields, "month")?.into_number("month")?,
        day: take(&mut fields, "day")?.into_number("day")?,
        account_name: take(&mut fields, "account_name")?.into_string("account_name")?,
        description: take(&mut fields, "description")?.into_string("description")?,
        is_inflow: take(&mut fields, "is_inflow")?.into_bool("is_inflow")?,
        currency: take(&mut fields, "currency")?.into_string("currency")?,
        amount: take(&mut fields, "amount")?.into_i64("amount")?,
    };
    Entry::try_from(raw).map_err(|err| err.to_string())
}

fn take<'a>(fields: &mut Vec<(String, Value<'a>)>, key: &str) -> Parsed<Value<'a>> {
    let position = fields
        .iter()
        .position(|(name, _)| name == key)
        .ok_or_else(|| format!("missing field `{key}`"))?;
    Ok(fields.swap_remove(position).1)
}

#[derive(Debug)]
enum Value<'a> {
    Null,
    Bool(bool),
    Number(&'a str),
    Str(String),
    List(Vec<Value<'a>>),
    Map(Vec<(String, Value<'a>)>),
}

impl<'a> Value<'a> {
    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::Str(_) => "a string",
            Value::List(_) => "a list",
            Value::Map(_) => "a map",
        }
    }

    fn mismatch<T>(&self, field: &str, expected: &str) -> Parsed<T> {
        Err(format!(
            "`{field}` should be {expected}, found {}",
            self.kind()
        ))
    }

    fn into_map(self, field: &str) -> Parsed<Vec<(String, Value<'a>)>> {
        match self {
            Value::Map(fields) => Ok(fields),
            other => other.mismatch(field, "a map"),
        }
    }

    fn into_string(self, field: &str) -> Parsed<String> {
        match self {
            Value::Str(value) => Ok(value),
            other => other.mismatch(field, "a string"),
        }
    }

    fn into_bool(self, field: &str) -> Parsed<bool> {
        match self {
            Value::Bool(value) => Ok(value),
            other => other.mismatch(field, "a boolean"),
        }
    }

    fn into_optional_bool(self, field: &str) -> Parsed<Option<bool>> {
        match self {
            Value::Null => Ok(None),
            other => other.into_bool(field).map(Some),
        }
    }

    fn into_number<T: FromStr>(self, field: &str) -> Parsed<T> {
        match self {
            Value::Number(token) => token
                .parse()
                .map_err(|_| format!("`{field}` is out of range: {token}")),
            other => other.mismatch(field, "an integer"),
        }
    }

    fn into_i64(self, field: &str) -> Parsed<i64> {
        self.into_number(field)
    }

    fn into_optional_i64(self, field: &str) -> Parsed<Option<i64>> {
        match self {
            Value::Null => Ok(None),
            other => other.into_i64(field).map(Some),
        }
    }

    fn into_decimal(self, field: &str) -> Parsed<Decimal> {
        match self {
            Value::Number(token) => Decimal::from_str(token)
                .map_err(|err| format!("`{field}` is not a decimal ({err}): {token}")),
            other => other.mismatch(field, "a decimal"),
        }
    }

    fn into_entries(self, field: &str) -> Parsed<Vec<Entry>> {
        match self {
            Value::List(items) => items.into_iter().map(entry_from_value).collect(),
            other => other.mismatch(field, "a list of entries"),
        }
    }
}

fn parse_body(body: &str, base: usize) -> Parsed<Value<'_>> {
    let mut parser = Parser {
        text: body,
        pos: 0,
        base,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos < body.len() {
        return parser.fail("trailing characters after record body");
    }
    Ok(value)
}

/// Deepest map or list nesting a record body may use. Well-formed records
/// stay under ten levels.
const MAX_DEPTH: usize = 32;

/// Recursive-descent reader for record bodies. Map keys may be quoted strings
/// or bare integers.
struct Parser<'a> {
    text: &'a str,
    pos: usize,
    base: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn fail<T>(&self, reason: &str) -> Parsed<T> {
        Err(format!("{reason} at byte {}", self.base + self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Parsed<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            self.fail(&format!("expected `{}`", byte as char))
        }
    }

    fn value(&mut self) -> Parsed<Value<'a>> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.nested(Self::map),
            Some(b'[') => self.nested(Self::list),
            Some(b'"') => self.string().map(Value::Str),
            Some(b'-' | b'0'..=b'9') => self.number().map(Value::Number),
            Some(b't' | b'f' | b'n') => self.keyword(),
            Some(other) => self.fail(&format!("unexpected character `{}`", other as char)),
            None => self.fail("unexpected end of record"),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Parsed<Value<'a>>) -> Parsed<Value<'a>> {
        if self.depth >= MAX_DEPTH {
            return self.fail("record nested too deeply");
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn map(&mut self) -> Parsed<Value<'a>> {
        self.pos += 1;
        let mut fields = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Map(fields));
        }
        loop {
            self.skip_whitespace();
            let key = match self.peek() {
                Some(b'"') => self.string()?,
                Some(b'-' | b'0'..=b'9') => self.number()?.to_string(),
                _ => return self.fail("expected a key"),
            };
            if fields.iter().any(|(seen, _)| *seen == key) {
                return self.fail(&format!("duplicate key `{key}`"));
            }
            self.expect(b':')?;
            let value = self.value()?;
            fields.push((key, value));
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Map(fields));
                }
                _ => return self.fail("expected `,` or `}`"),
            }
        }
    }

    fn list(&mut self) -> Parsed<Value<'a>> {
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                _ => return self.fail("expected `,` or `]`"),
            }
        }
    }

    /// Finds the closing quote, then lets `serde_json` unescape the token.
    fn string(&mut self) -> Parsed<String> {
        let start = self.pos;
        let text = self.text;
        let bytes = text.as_bytes();
        let mut cursor = start + 1;
        loop {
            match bytes.get(cursor) {
                None => return self.fail("unterminated string"),
                Some(b'\\') => cursor += 2,
                Some(b'"') => break,
                Some(_) => cursor += 1,
            }
        }
        let token = &text[start..=cursor];
        let decoded = serde_json::from_str::<String>(token)
            .map_err(|err| format!("invalid string at byte {}: {err}", self.base + start))?;
        self.pos = cursor + 1;
        Ok(decoded)
    }

    fn number(&mut self) -> Parsed<&'a str> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self
            .peek()
            .is_some_and(|byte| byte.is_ascii_digit() || byte == b'.')
        {
            self.pos += 1;
        }
        let text = self.text;
        let token = &text[start..self.pos];
        if !token.bytes().any(|byte| byte.is_ascii_digit()) {
            return self.fail("expected digits");
        }
        Ok(token)
    }

    fn keyword(&mut self) -> Parsed<Value<'a>> {
        let text = self.text;
        let rest = &text[self.pos..];
        for (word, value) in [
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("null", Value::Null),
        ] {
            if rest.starts_with(word) {
                self.pos += word.len();
                return Ok(value);
            }
        }
        self.fail("unknown keyword")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::GoalOverrides;

    fn entry(day: u32, description: &str, amount: i64) -> Entry {
        Entry::new(2015, 11, day, "Fast Food", description, "$", amount, false).unwrap()
    }

    fn fast_food() -> Account {
        Account::new(
            "Fast Food",
            Some(false),
            vec![entry(24, "McDonald's", 300), entry(25, "Wendy's", 200)],
            GoalOverrides::new(),
        )
        .unwrap()
    }

    #[test]
    fn encodes_fields_in_fixed_order() {
        let text = encode(&[fast_food()]);
        assert!(text.starts_with("ACCOUNTx{\"budgets\": {2015: {11: {\"acct_entries\": [{\"year\": 2015, \"month\": 11, \"day\": 24, \"account_name\": \"Fast Food\", \"description\": \"McDonald's\", \"is_inflow\": false, \"currency\": \"$\", \"amount\": 300}"));
        assert!(text.contains("\"goal\": -500, \"reached\": -500, \"remaining\": 0, \"percent_remaining\": "));
        assert!(text.ends_with("\"name\": \"Fast Food\", \"is_saving\": false}\n"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn round_trips_accounts() {
        let accounts = vec![fast_food()];
        let text = encode(&accounts);
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded, accounts);
        assert_eq!(encode(&decoded), text);
    }

    #[test]
    fn escapes_delimiters_inside_descriptions() {
        let tricky = "ACCOUNTx{\"budgets\"\nsecond line \\ \"quoted\"";
        let account = Account::new(
            "Fast Food",
            None,
            vec![entry(3, tricky, 150)],
            GoalOverrides::new(),
        )
        .unwrap();
        let text = encode(std::slice::from_ref(&account));
        assert_eq!(text.lines().count(), 1);

        let decoded = decode(&text).unwrap();
        let restored: Vec<_> = decoded[0].entries().cloned().collect();
        assert_eq!(restored[0].description(), tricky);
        assert_eq!(decoded[0].is_saving(), None);
    }

    #[test]
    fn corrupt_record_names_number_and_span() {
        let good = encode(&[fast_food()]);
        let bad = "ACCOUNTx{\"budgets\": {2015: {11: {\"acct_entries\": [}}}}\n";
        let text = format!("{good}{bad}");

        let err = decode(&text).unwrap_err();
        match err {
            LedgerError::CorruptRecord { record, span, .. } => {
                assert_eq!(record, 2);
                assert_eq!(span, good.len()..good.len() + bad.len() - 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_markers_and_invalid_fields() {
        assert!(matches!(
            decode("LEDGERx{}\n"),
            Err(LedgerError::CorruptRecord { record: 1, .. })
        ));

        let text = encode(&[fast_food()]).replace("\"day\": 24", "\"day\": 31");
        let err = decode(&text).unwrap_err();
        assert!(err.to_string().contains("day"), "{err}");
    }

    #[test]
    fn lenient_decode_keeps_valid_records() {
        let good = encode(&[fast_food()]);
        let text = format!("garbage line\n{good}ACCOUNTx{{\n");
        let decoded = decode_lenient(&text);

        assert_eq!(decoded.accounts, vec![fast_food()]);
        let dropped: Vec<usize> = decoded.dropped.iter().map(|drop| drop.record).collect();
        assert_eq!(dropped, vec![1, 3]);
        assert_eq!(decoded.dropped[0].span, 0..12);
    }

    #[test]
    fn session_round_trips_indexes() {
        let mut inflows: EntryIndex = [Entry::new(2016, 1, 4, "Salary", "Payroll", "$", 250_000, true).unwrap()]
            .into_iter()
            .collect();
        inflows.total_amount().unwrap();
        let mut outflows: EntryIndex = fast_food().entries().cloned().collect();
        outflows.total_amount().unwrap();
        let session = Session {
            accounts: vec![fast_food()],
            inflows,
            outflows,
        };

        let text = encode_session(&session);
        assert_eq!(text.lines().count(), 3);
        assert_eq!(decode_session(&text).unwrap(), session);
        assert_eq!(decode(&text).unwrap(), session.accounts);
    }

    #[test]
    fn deeply_nested_bodies_are_corrupt() {
        let text = format!("ACCOUNTx{}\n{}", "[".repeat(20_000), encode(&[fast_food()]));
        match decode(&text) {
            Err(LedgerError::CorruptRecord { record, reason, .. }) => {
                assert_eq!(record, 1);
                assert!(reason.contains("nested too deeply"), "{reason}");
            }
            other => panic!("expected a corrupt record, got {other:?}"),
        }

        let decoded = decode_lenient(&text);
        assert_eq!(decoded.accounts, vec![fast_food()]);
        assert_eq!(decoded.dropped.len(), 1);
    }

    #[test]
    fn repeated_keys_are_corrupt() {
        let text = encode(&[fast_food()])
            .replace("\"name\": \"Fast Food\"", "\"name\": \"Fast Food\", \"name\": \"Pizza\"");
        let err = decode(&text).unwrap_err();
        assert!(
            matches!(&err, LedgerError::CorruptRecord { record: 1, reason, .. } if reason.contains("duplicate key `name`")),
            "{err}"
        );
    }

    #[test]
    fn duplicate_direction_is_corrupt() {
        let line = encode_index(&EntryIndex::new(), Direction::Inflow);
        assert_eq!(line, "FLOWSx{\"direction\": \"inflow\", \"periods\": {}, \"total\": 0}\n");
        let err = decode_session(&format!("{line}{line}")).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord { record: 2, .. }));
    }
}
