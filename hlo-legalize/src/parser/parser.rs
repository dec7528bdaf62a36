use crate::dialect::mhlo;
use crate::dialect::mhlo::MhloAttr;
use crate::dialect::mhlo::MhloOp;
use crate::dialect::stablehlo;
use crate::dialect::stablehlo::StablehloAttr;
use crate::dialect::stablehlo::StablehloOp;
use crate::dialect::DialectAttribute;
use crate::dialect::OpKind;
use crate::dialect::RegionCount;
use crate::ir::adopt_ops;
use crate::ir::into_shared;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::Block;
use crate::ir::BlockArgument;
use crate::ir::DenseArrayAttr;
use crate::ir::DenseElementsAttr;
use crate::ir::DialectType;
use crate::ir::FieldValue;
use crate::ir::FloatAttr;
use crate::ir::FloatType;
use crate::ir::FunctionType;
use crate::ir::IntegerAttr;
use crate::ir::IntegerType;
use crate::ir::OpResult;
use crate::ir::OpaqueAttr;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::RecordFields;
use crate::ir::Region;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::ir::Value;
use crate::ir::DYNAMIC;
use crate::ir::MODULE;
use crate::parser::scanner::Scanner;
use crate::parser::token::Token;
use crate::parser::token::TokenKind;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Interface to add dialect-specific parsing to the parser.
///
/// The parser itself only knows the generic operation syntax and the builtin
/// attributes and types. Downstream crates can implement this trait to
/// support more dialects. The default implementation knows about the
/// dialects defined in this crate. This gives the Rust compiler more insight
/// into the dispatches compared to using a hashmap registry.
pub trait ParserDispatch {
    /// Parse the rest of a dialect attribute after `#dialect` or
    /// `#dialect.mnemonic` has been consumed.
    ///
    /// Return `None` without consuming tokens if the attribute is unknown.
    /// The parser then keeps the attribute as an [OpaqueAttr].
    fn parse_dialect_attribute(
        parser: &mut Parser<Self>,
        dialect: &str,
        mnemonic: Option<&str>,
    ) -> Result<Option<Attribute>>
    where
        Self: Sized;
    /// Check a parsed operation against the schema of its dialect.
    fn verify_operation(operation: &Operation) -> Result<()>;
}

/// Default dialect parser.
///
/// This parser knows about the `stablehlo` and `mhlo` dialects. Operations of
/// other dialects are accepted as they are.
pub struct DefaultParserDispatch;

fn verify_kind<K: OpKind>(operation: &Operation) -> Result<()> {
    let name = operation.name();
    let kind = match K::from_operation_name(name.as_str()) {
        Some(kind) => kind,
        None => return Err(anyhow::anyhow!("Unknown operation: {name}")),
    };
    let found = operation.regions().len();
    match kind.regions() {
        RegionCount::Fixed(expected) if expected != found => Err(anyhow::anyhow!(
            "Expected {name} to have {expected} regions, but got {found}"
        )),
        _ => Ok(()),
    }
}

/// Parse `#dialect<mnemonic SYMBOL>` or `#dialect.mnemonic<fields>`.
fn parse_hlo_attribute<T: ParserDispatch, A: DialectAttribute>(
    parser: &mut Parser<T>,
    mnemonic: Option<&str>,
) -> Result<Option<A>> {
    let location = parser.previous().clone();
    match mnemonic {
        None => {
            let is_enum = parser.check(TokenKind::Less)
                && parser.peek_n(1).kind == TokenKind::BareIdentifier
                && parser.peek_n(2).kind == TokenKind::BareIdentifier
                && parser.peek_n(3).kind == TokenKind::Greater;
            if !is_enum {
                return Ok(None);
            }
            let kind = parser.peek_n(1).lexeme.clone();
            let symbol = parser.peek_n(2).clone();
            match A::from_symbol(&kind, &symbol.lexeme) {
                Ok(Some(attr)) => {
                    for _ in 0..4 {
                        parser.advance();
                    }
                    Ok(Some(attr))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(anyhow::anyhow!(parser.error(&symbol, &e.to_string()))),
            }
        }
        Some(mnemonic) => match A::record_prefix(mnemonic) {
            Some(prefix) => {
                let fields = parser.record_fields(prefix)?;
                match A::from_fields(mnemonic, fields) {
                    Ok(attr) => Ok(attr),
                    Err(e) => Err(anyhow::anyhow!(parser.error(&location, &e.to_string()))),
                }
            }
            None => Ok(None),
        },
    }
}

impl ParserDispatch for DefaultParserDispatch {
    fn parse_dialect_attribute(
        parser: &mut Parser<Self>,
        dialect: &str,
        mnemonic: Option<&str>,
    ) -> Result<Option<Attribute>> {
        match dialect {
            stablehlo::DIALECT => {
                let attr = parse_hlo_attribute::<Self, StablehloAttr>(parser, mnemonic)?;
                Ok(attr.map(Attribute::StableHlo))
            }
            mhlo::DIALECT => {
                let attr = parse_hlo_attribute::<Self, MhloAttr>(parser, mnemonic)?;
                Ok(attr.map(Attribute::Mhlo))
            }
            _ => Ok(None),
        }
    }
    fn verify_operation(operation: &Operation) -> Result<()> {
        match operation.name().dialect() {
            stablehlo::DIALECT => verify_kind::<StablehloOp>(operation),
            mhlo::DIALECT => verify_kind::<MhloOp>(operation),
            _ => Ok(()),
        }
    }
}

/// Undo the escaping of a string literal (including the quotes).
fn unescape(lexeme: &str) -> String {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(high) => {
                // Hexadecimal escape such as `\0A`.
                let low = chars.next().unwrap_or('0');
                let code = format!("{high}{low}");
                match u8::from_str_radix(&code, 16) {
                    Ok(byte) => out.push(byte as char),
                    Err(_) => {
                        out.push(high);
                        out.push(low);
                    }
                }
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A name on the left-hand side of an operation (`%0` or `%0:2`).
struct ResultName {
    name: String,
    count: usize,
}

pub struct Parser<T: ParserDispatch> {
    src: String,
    chars: Vec<char>,
    tokens: Vec<Token>,
    current: usize,
    /// Values that are visible at the current position, innermost last.
    scopes: Vec<HashMap<String, Shared<Value>>>,
    parse_op: std::marker::PhantomData<T>,
}

impl<T: ParserDispatch> Parser<T> {
    pub fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
    pub fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    pub fn peek(&self) -> &Token {
        self.peek_n(0)
    }
    /// Look ahead `n` tokens (the end of file token if that is past the end).
    pub fn peek_n(&self, n: usize) -> &Token {
        let index = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }
    /// Whether the next token is the bare identifier `keyword`.
    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.check(TokenKind::BareIdentifier) && self.peek().lexeme == keyword
    }
    pub fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }
    pub fn error(&self, token: &Token, msg: &str) -> String {
        let msg = Scanner::error(&self.src, &token.location, msg);
        format!("\n\n{msg}\n")
    }
    pub fn report_token_error(&self, token: &Token, expected: TokenKind) -> Result<Token> {
        let msg = format!(
            "Expected {:?}, but got \"{}\" of kind {:?}",
            expected, token.lexeme, token.kind
        );
        Err(anyhow::anyhow!(self.error(token, &msg)))
    }
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(kind) {
            self.advance();
            Ok(self.previous().clone())
        } else {
            self.report_token_error(self.peek(), kind)
        }
    }
    fn lookup(&self, name: &str) -> Option<Shared<Value>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
    }
    fn define(&mut self, token: &Token, key: String, value: Shared<Value>) -> Result<()> {
        if self.lookup(&key).is_some() {
            let msg = format!("Value {key} is already defined");
            return Err(anyhow::anyhow!(self.error(token, &msg)));
        }
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(key, value);
                Ok(())
            }
            None => Err(anyhow::anyhow!("No scope to define {key} in")),
        }
    }
    /// Raw text between `<` and the matching `>`.
    pub fn raw_body(&mut self) -> Result<String> {
        let open = self.expect(TokenKind::Less)?;
        let mut depth = 1;
        loop {
            if self.is_at_end() {
                let msg = "Expected `>` to close this `<`";
                return Err(anyhow::anyhow!(self.error(&open, msg)));
            }
            match self.advance().kind {
                TokenKind::Less => depth += 1,
                TokenKind::Greater => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => (),
            }
        }
        let close = self.previous().location.start();
        let body: String = self.chars[open.end()..close].iter().collect();
        Ok(body.trim().to_string())
    }
    /// Parse a dimension such as `4`, `-1` or `?`.
    fn dimension(&mut self) -> Result<i64> {
        if self.match_kind(TokenKind::Question) {
            return Ok(DYNAMIC);
        }
        let negative = self.match_kind(TokenKind::Minus);
        let token = self.expect(TokenKind::Integer)?;
        let value = match token.lexeme.parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                let msg = "Integer is out of range";
                return Err(anyhow::anyhow!(self.error(&token, msg)));
            }
        };
        Ok(if negative { -value } else { value })
    }
    /// Parse the fields of a record attribute such as
    /// `<offset_dims = [0], index_vector_dim = 1>`.
    pub fn record_fields(&mut self, prefix: Option<&str>) -> Result<RecordFields> {
        self.expect(TokenKind::Less)?;
        if let Some(prefix) = prefix {
            if self.check_keyword(prefix) {
                self.advance();
            }
        }
        let mut fields = RecordFields::new();
        if !self.check(TokenKind::Greater) {
            loop {
                let name = self.expect(TokenKind::BareIdentifier)?;
                self.expect(TokenKind::Equal)?;
                let value = if self.match_kind(TokenKind::LBracket) {
                    let mut values = vec![];
                    if !self.check(TokenKind::RBracket) {
                        loop {
                            values.push(self.dimension()?);
                            if !self.match_kind(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RBracket)?;
                    FieldValue::Ints(values)
                } else {
                    FieldValue::Int(self.dimension()?)
                };
                if let Err(e) = fields.push(&name.lexeme, value) {
                    return Err(anyhow::anyhow!(self.error(&name, &e.to_string())));
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Greater)?;
        Ok(fields)
    }
}

/// Types.
impl<T: ParserDispatch> Parser<T> {
    /// Parse types until (but not including) `end`.
    fn types_until(&mut self, end: TokenKind) -> Result<Vec<Type>> {
        let mut types = vec![];
        if self.check(end) {
            return Ok(types);
        }
        loop {
            types.push(self.typ()?);
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        Ok(types)
    }
    /// Parse `(T, T) -> T` or `(T) -> (T, T)`.
    pub fn function_type(&mut self) -> Result<FunctionType> {
        self.expect(TokenKind::LParen)?;
        let inputs = self.types_until(TokenKind::RParen)?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Arrow)?;
        let results = if self.match_kind(TokenKind::LParen) {
            let results = self.types_until(TokenKind::RParen)?;
            self.expect(TokenKind::RParen)?;
            results
        } else {
            vec![self.typ()?]
        };
        Ok(FunctionType::new(inputs, results))
    }
    /// Parse the part of `tensor<4x?xf32>` after `tensor`.
    fn tensor_type(&mut self) -> Result<Type> {
        self.expect(TokenKind::Less)?;
        if self.match_kind(TokenKind::Star) {
            self.expect(TokenKind::DimensionSeparator)?;
            let element = self.typ()?;
            self.expect(TokenKind::Greater)?;
            return Ok(Type::UnrankedTensor(Box::new(element)));
        }
        let mut shape = vec![];
        while matches!(self.peek().kind, TokenKind::Integer | TokenKind::Question)
            && self.peek_n(1).kind == TokenKind::DimensionSeparator
        {
            shape.push(self.dimension()?);
            self.expect(TokenKind::DimensionSeparator)?;
        }
        let element = self.typ()?;
        let encoding = if self.match_kind(TokenKind::Comma) {
            Some(self.attribute()?)
        } else {
            None
        };
        self.expect(TokenKind::Greater)?;
        Ok(Type::RankedTensor(
            TensorType::new(shape, element).with_encoding(encoding),
        ))
    }
    pub fn typ(&mut self) -> Result<Type> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LParen => Ok(Type::Function(self.function_type()?)),
            TokenKind::Exclamation => {
                self.advance();
                let name = self.expect(TokenKind::BareIdentifier)?;
                let (dialect, typ) = match name.lexeme.split_once('.') {
                    Some(split) => split,
                    None => {
                        let msg = "Expected dialect type such as `!stablehlo.token`";
                        return Err(anyhow::anyhow!(self.error(&name, msg)));
                    }
                };
                let body = if self.check(TokenKind::Less) {
                    Some(self.raw_body()?)
                } else {
                    None
                };
                Ok(Type::Dialect(DialectType::new(dialect, typ).with_body(body)))
            }
            TokenKind::BareIdentifier => {
                self.advance();
                match token.lexeme.as_str() {
                    "index" => Ok(Type::Index),
                    "complex" => {
                        self.expect(TokenKind::Less)?;
                        let element = self.typ()?;
                        self.expect(TokenKind::Greater)?;
                        Ok(Type::Complex(Box::new(element)))
                    }
                    "tensor" => self.tensor_type(),
                    "tuple" => {
                        self.expect(TokenKind::Less)?;
                        let types = self.types_until(TokenKind::Greater)?;
                        self.expect(TokenKind::Greater)?;
                        Ok(Type::Tuple(types))
                    }
                    name => {
                        if let Some(typ) = IntegerType::from_str(name) {
                            Ok(Type::Integer(typ))
                        } else if let Some(typ) = FloatType::from_str(name) {
                            Ok(Type::Float(typ))
                        } else {
                            let msg = format!("Unknown type `{name}`");
                            Err(anyhow::anyhow!(self.error(&token, &msg)))
                        }
                    }
                }
            }
            _ => Err(anyhow::anyhow!(self.error(&token, "Expected type"))),
        }
    }
}

/// Attributes.
impl<T: ParserDispatch> Parser<T> {
    fn number_attribute(&mut self) -> Result<Attribute> {
        let negative = self.match_kind(TokenKind::Minus);
        let token = self.advance().clone();
        let sign = if negative { "-" } else { "" };
        let text = format!("{sign}{}", token.lexeme);
        match token.kind {
            TokenKind::Integer => {
                let value = match text.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        let msg = "Integer is out of range";
                        return Err(anyhow::anyhow!(self.error(&token, msg)));
                    }
                };
                let typ = if self.match_kind(TokenKind::Colon) {
                    self.typ()?
                } else {
                    Type::int(64)
                };
                Ok(Attribute::Integer(IntegerAttr::new(typ, value)))
            }
            TokenKind::FloatLiteral => {
                let value = match text.parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        let msg = "Invalid float";
                        return Err(anyhow::anyhow!(self.error(&token, msg)));
                    }
                };
                let typ = if self.match_kind(TokenKind::Colon) {
                    self.typ()?
                } else {
                    Type::Float(FloatType::F64)
                };
                Ok(Attribute::Float(FloatAttr::new(typ, value)))
            }
            _ => Err(anyhow::anyhow!(self.error(&token, "Expected number"))),
        }
    }
    /// Parse the part of `array<i64: 1, 2>` after `array`.
    fn dense_array(&mut self) -> Result<Attribute> {
        self.expect(TokenKind::Less)?;
        let element = self.typ()?;
        let mut values = vec![];
        if self.match_kind(TokenKind::Colon) {
            loop {
                if self.check_keyword("true") || self.check_keyword("false") {
                    values.push(if self.advance().lexeme == "true" { 1 } else { 0 });
                } else {
                    values.push(self.dimension()?);
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Greater)?;
        Ok(Attribute::DenseArray(DenseArrayAttr::new(element, values)))
    }
    fn dialect_attribute(&mut self) -> Result<Attribute> {
        let token = self.expect(TokenKind::HashIdentifier)?;
        let name = &token.lexeme[1..];
        let (dialect, mnemonic) = match name.split_once('.') {
            Some((dialect, mnemonic)) => (dialect, Some(mnemonic)),
            None => (name, None),
        };
        if let Some(attr) = T::parse_dialect_attribute(self, dialect, mnemonic)? {
            return Ok(attr);
        }
        if !self.check(TokenKind::Less) {
            let msg = "Attribute aliases are not supported";
            return Err(anyhow::anyhow!(self.error(&token, msg)));
        }
        let body = self.raw_body()?;
        Ok(Attribute::Opaque(OpaqueAttr::new(dialect, mnemonic, &body)))
    }
    pub fn attribute(&mut self) -> Result<Attribute> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::BareIdentifier => match token.lexeme.as_str() {
                "unit" => {
                    self.advance();
                    Ok(Attribute::Unit)
                }
                "true" | "false" => {
                    self.advance();
                    Ok(Attribute::Bool(token.lexeme == "true"))
                }
                "array" => {
                    self.advance();
                    self.dense_array()
                }
                "dense" => {
                    self.advance();
                    let body = self.raw_body()?;
                    self.expect(TokenKind::Colon)?;
                    let typ = self.typ()?;
                    Ok(Attribute::DenseElements(DenseElementsAttr::new(&body, typ)))
                }
                _ => Ok(Attribute::Type(self.typ()?)),
            },
            TokenKind::Integer | TokenKind::FloatLiteral | TokenKind::Minus => {
                self.number_attribute()
            }
            TokenKind::String => {
                self.advance();
                Ok(Attribute::String(unescape(&token.lexeme)))
            }
            TokenKind::AtIdentifier => {
                self.advance();
                Ok(Attribute::SymbolRef(token.lexeme[1..].to_string()))
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = vec![];
                if !self.check(TokenKind::RBracket) {
                    loop {
                        elements.push(self.attribute()?);
                        if !self.match_kind(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Attribute::Array(elements))
            }
            TokenKind::HashIdentifier => self.dialect_attribute(),
            TokenKind::Exclamation | TokenKind::LParen => Ok(Attribute::Type(self.typ()?)),
            _ => Err(anyhow::anyhow!(self.error(&token, "Expected attribute"))),
        }
    }
    /// Parse `{name = value, flag}`.
    pub fn attribute_dict(&mut self) -> Result<Attributes> {
        self.expect(TokenKind::LBrace)?;
        let mut attributes = Attributes::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let token = self.advance().clone();
                let name = match token.kind {
                    TokenKind::BareIdentifier => token.lexeme.clone(),
                    TokenKind::String => unescape(&token.lexeme),
                    _ => {
                        let msg = "Expected attribute name";
                        return Err(anyhow::anyhow!(self.error(&token, msg)));
                    }
                };
                let value = if self.match_kind(TokenKind::Equal) {
                    self.attribute()?
                } else {
                    Attribute::Unit
                };
                if attributes.insert(&name, value).is_some() {
                    let msg = format!("Duplicate attribute `{name}`");
                    return Err(anyhow::anyhow!(self.error(&token, &msg)));
                }
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(attributes)
    }
}

/// Operations, regions and blocks.
impl<T: ParserDispatch> Parser<T> {
    // Parse %0.
    fn operand(&mut self) -> Result<Shared<Value>> {
        let identifier = self.expect(TokenKind::PercentIdentifier)?;
        match self.lookup(&identifier.lexeme) {
            Some(value) => Ok(value),
            None => {
                let msg = "Expected assignment before use.";
                Err(anyhow::anyhow!(self.error(&identifier, msg)))
            }
        }
    }
    /// Parse `%0, %1:2 =`.
    fn result_names(&mut self) -> Result<Vec<(ResultName, Token)>> {
        let mut names = vec![];
        loop {
            let token = self.expect(TokenKind::PercentIdentifier)?;
            if token.lexeme.contains('#') {
                let msg = "Result names cannot contain `#`";
                return Err(anyhow::anyhow!(self.error(&token, msg)));
            }
            let count = if self.match_kind(TokenKind::Colon) {
                let count = self.expect(TokenKind::Integer)?;
                match count.lexeme.parse::<usize>() {
                    Ok(count) if 0 < count => count,
                    _ => {
                        let msg = "Expected a positive number of results";
                        return Err(anyhow::anyhow!(self.error(&count, msg)));
                    }
                }
            } else {
                1
            };
            let name = ResultName {
                name: token.lexeme.clone(),
                count,
            };
            names.push((name, token));
            if !self.match_kind(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Equal)?;
        Ok(names)
    }
    fn block(&mut self) -> Result<Shared<Block>> {
        let mut label = None;
        let mut arguments = vec![];
        if self.check(TokenKind::CaretIdentifier) {
            label = Some(self.advance().lexeme.clone());
            if self.match_kind(TokenKind::LParen) {
                loop {
                    let name = self.expect(TokenKind::PercentIdentifier)?;
                    self.expect(TokenKind::Colon)?;
                    let typ = self.typ()?;
                    let argument = BlockArgument::new(&name.lexeme, typ);
                    let argument: Shared<Value> = Shared::new(Value::BlockArgument(argument).into());
                    self.define(&name, name.lexeme.clone(), argument.clone())?;
                    arguments.push(argument);
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen)?;
            }
            self.expect(TokenKind::Colon)?;
        }
        let block = Shared::new(Block::new(label, arguments).into());
        while !self.check(TokenKind::RBrace)
            && !self.check(TokenKind::CaretIdentifier)
            && !self.is_at_end()
        {
            let op = self.op()?;
            block.wr().push_op(op);
        }
        adopt_ops(&block);
        Ok(block)
    }
    pub fn region(&mut self) -> Result<Shared<Region>> {
        self.expect(TokenKind::LBrace)?;
        self.scopes.push(HashMap::new());
        let mut blocks = vec![];
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                let token = self.peek().clone();
                return Err(anyhow::anyhow!(self.error(&token, "Expected `}` to close region")));
            }
            blocks.push(self.block()?);
        }
        self.expect(TokenKind::RBrace)?;
        self.scopes.pop();
        let region: Shared<Region> = Shared::new(Region::default().into());
        region.wr().set_blocks(blocks, Arc::downgrade(&region));
        Ok(region)
    }
    /// Parse `module @name attributes {..} { .. }`.
    fn module_op(&mut self) -> Result<Shared<Operation>> {
        self.expect(TokenKind::BareIdentifier)?;
        let mut attributes = Attributes::new();
        if self.check(TokenKind::AtIdentifier) {
            let name = self.advance().lexeme[1..].to_string();
            attributes.insert("sym_name", Attribute::String(name));
        }
        if self.check_keyword("attributes") {
            self.advance();
            for (name, attribute) in self.attribute_dict()?.iter() {
                attributes.insert(name, attribute.clone());
            }
        }
        let region = self.region()?;
        let mut operation = Operation::new(OperationName::new(MODULE.to_string()));
        operation.set_attributes(attributes);
        operation.add_region(region);
        Ok(into_shared(operation))
    }
    /// Parse `"d.op"(%a) ({..}) {attrs} : (T) -> T` after the results.
    fn generic_op(&mut self, names: Vec<(ResultName, Token)>) -> Result<Shared<Operation>> {
        let name_token = self.expect(TokenKind::String)?;
        let name = OperationName::new(unescape(&name_token.lexeme));
        self.expect(TokenKind::LParen)?;
        let mut operands = vec![];
        let mut operand_tokens = vec![];
        if !self.check(TokenKind::RParen) {
            loop {
                operand_tokens.push(self.peek().clone());
                operands.push(self.operand()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let mut regions = vec![];
        if self.check(TokenKind::LParen) && self.peek_n(1).kind == TokenKind::LBrace {
            self.advance();
            loop {
                regions.push(self.region()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        let attributes = if self.check(TokenKind::LBrace) {
            self.attribute_dict()?
        } else {
            Attributes::new()
        };
        self.expect(TokenKind::Colon)?;
        let typ_token = self.peek().clone();
        let typ = self.function_type()?;

        if typ.inputs().len() != operands.len() {
            let msg = format!(
                "Expected {} operand types, but got {}",
                operands.len(),
                typ.inputs().len()
            );
            return Err(anyhow::anyhow!(self.error(&typ_token, &msg)));
        }
        for ((operand, token), expected) in operands.iter().zip(&operand_tokens).zip(typ.inputs()) {
            let actual = operand.rd().typ().clone();
            if &actual != expected {
                let msg = format!("Type mismatch: operand has type {actual}, but {expected} was given");
                return Err(anyhow::anyhow!(self.error(token, &msg)));
            }
        }
        let num_results: usize = names.iter().map(|(name, _)| name.count).sum();
        if typ.results().len() != num_results {
            let msg = format!(
                "Expected {} result types, but got {}",
                num_results,
                typ.results().len()
            );
            return Err(anyhow::anyhow!(self.error(&typ_token, &msg)));
        }

        let mut results = vec![];
        let mut result_types = typ.results().iter();
        let mut definitions = vec![];
        for (name, token) in &names {
            for i in 0..name.count {
                let typ = match result_types.next() {
                    Some(typ) => typ.clone(),
                    None => return Err(anyhow::anyhow!(self.error(token, "Missing result type"))),
                };
                let index = if name.count == 1 { None } else { Some(i) };
                let value: Shared<Value> =
                    Shared::new(Value::OpResult(OpResult::new(&name.name, index, typ)).into());
                let key = value.rd().to_string();
                definitions.push((token.clone(), key, value.clone()));
                results.push(value);
            }
        }

        let mut operation = Operation::new(name);
        operation.set_operands(operands);
        operation.set_results(results);
        operation.set_attributes(attributes);
        for region in regions {
            operation.add_region(region);
        }
        if let Err(e) = T::verify_operation(&operation) {
            return Err(anyhow::anyhow!(self.error(&name_token, &e.to_string())));
        }
        for (token, key, value) in definitions {
            self.define(&token, key, value)?;
        }
        Ok(into_shared(operation))
    }
    pub fn op(&mut self) -> Result<Shared<Operation>> {
        let names = if self.check(TokenKind::PercentIdentifier) {
            self.result_names()?
        } else {
            vec![]
        };
        if self.check(TokenKind::String) {
            self.generic_op(names)
        } else if self.check_keyword("module") && names.is_empty() {
            self.module_op()
        } else {
            let token = self.peek().clone();
            Err(anyhow::anyhow!(self.error(&token, "Expected operation")))
        }
    }
    /// Parse the source into a module.
    ///
    /// Sources that do not consist of a single `module` are wrapped into
    /// one.
    pub fn parse(src: &str) -> Result<Shared<Operation>> {
        let mut parser = Parser::<T> {
            src: src.to_string(),
            chars: src.chars().collect(),
            tokens: Scanner::scan(src)?,
            current: 0,
            scopes: vec![HashMap::new()],
            parse_op: std::marker::PhantomData,
        };
        let mut ops = vec![];
        while !parser.is_at_end() {
            ops.push(parser.op()?);
        }
        if ops.len() == 1 && ops[0].rd().is_module() {
            return Ok(ops.remove(0));
        }
        let block = Shared::new(Block::new(None, vec![]).into());
        for op in ops {
            block.wr().push_op(op);
        }
        adopt_ops(&block);
        let region: Shared<Region> = Shared::new(Region::default().into());
        region.wr().set_blocks(vec![block], Arc::downgrade(&region));
        let mut module = Operation::new(OperationName::new(MODULE.to_string()));
        module.add_region(region);
        Ok(into_shared(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::stablehlo::ComparisonDirection;
    use crate::ir::GuardedOperation;
    use indoc::indoc;

    fn parse(src: &str) -> Result<Shared<Operation>> {
        Parser::<DefaultParserDispatch>::parse(src)
    }

    #[test]
    fn parse_compare() {
        let src = indoc! {r#"
        %0 = "stablehlo.compare"(%arg0, %arg1) {comparison_direction = #stablehlo<comparison_direction GE>} : (tensor<4xf32>, tensor<4xf32>) -> tensor<4xi1>
        "#};
        // Operands must be defined first.
        assert!(parse(src).is_err());

        let src = indoc! {r#"
        "func.func"() ({
        ^bb0(%arg0: tensor<4xf32>, %arg1: tensor<4xf32>):
          %0 = "stablehlo.compare"(%arg0, %arg1) {comparison_direction = #stablehlo<comparison_direction GE>} : (tensor<4xf32>, tensor<4xf32>) -> tensor<4xi1>
          "func.return"(%0) : (tensor<4xi1>) -> ()
        }) {sym_name = "main"} : () -> ()
        "#};
        let module = parse(src).unwrap();
        assert!(module.rd().is_module());
        let func = module.ops()[0].clone();
        let compare = func.ops()[0].clone();
        let compare = compare.rd();
        assert_eq!(compare.name().as_str(), "stablehlo.compare");
        assert_eq!(compare.operands().len(), 2);
        let direction = compare.attributes().get("comparison_direction").unwrap();
        assert_eq!(
            direction,
            &Attribute::StableHlo(StablehloAttr::ComparisonDirection(
                ComparisonDirection::GreaterThanOrEqual
            ))
        );
        assert_eq!(compare.result_types()[0].to_string(), "tensor<4xi1>");
        assert!(compare.parent().is_some());
    }

    #[test]
    fn parse_errors() {
        let src = r#"%0 = "stablehlo.does_not_exist"() : () -> i32"#;
        let err = parse(src).unwrap_err().to_string();
        assert!(err.contains("Unknown operation: stablehlo.does_not_exist"));

        let src = r#"%0 = "stablehlo.while"() ({}) : () -> i32"#;
        let err = parse(src).unwrap_err().to_string();
        assert!(err.contains("to have 2 regions, but got 1"));

        let src = r#"%0:2 = "foo.bar"() : () -> i32"#;
        let err = parse(src).unwrap_err().to_string();
        assert!(err.contains("Expected 2 result types, but got 1"));

        let src = r#""foo.bar"() {a = 1, a = 2} : () -> ()"#;
        let err = parse(src).unwrap_err().to_string();
        assert!(err.contains("Duplicate attribute `a`"));

        let src = r#""foo.bar"() {a = #stablehlo<precision PACKED_NIBBLE>} : () -> ()"#;
        let err = parse(src).unwrap_err().to_string();
        assert!(err.contains("Unknown precision symbol `PACKED_NIBBLE`"));
    }

    #[test]
    fn parse_attributes() {
        let src = indoc! {r#"
        "foo.bar"() {
          a = [1 : i32, -2],
          b = array<i64: 0, 1>,
          c = dense<[1.0, 2.0]> : tensor<2xf32>,
          d = #foo.baz<1 <2>>,
          e = #stablehlo.gather<offset_dims = [1], collapsed_slice_dims = [0], start_index_map = [0], index_vector_dim = 1>,
          f = "x\"y",
          g,
          h = tensor<?x4xf32, #stablehlo.type_extensions<bounds = [8, ?]>>
        } : () -> ()
        "#};
        let module = parse(src).unwrap();
        let op = module.ops()[0].clone();
        let op = op.rd();
        let attributes = op.attributes();
        assert_eq!(attributes.len(), 8);
        assert_eq!(attributes.get("a").unwrap().to_string(), "[1 : i32, -2 : i64]");
        assert_eq!(attributes.get("b").unwrap().to_string(), "array<i64: 0, 1>");
        assert_eq!(
            attributes.get("c").unwrap().to_string(),
            "dense<[1.0, 2.0]> : tensor<2xf32>"
        );
        let opaque = attributes.get("d").unwrap();
        assert_eq!(opaque.to_string(), "#foo.baz<1 <2>>");
        assert_eq!(opaque.namespace(), "foo");
        assert!(matches!(
            attributes.get("e").unwrap(),
            Attribute::StableHlo(StablehloAttr::GatherDimensionNumbers(_))
        ));
        assert_eq!(attributes.get("f").unwrap(), &Attribute::String("x\"y".to_string()));
        assert_eq!(attributes.get("g").unwrap(), &Attribute::Unit);
        assert_eq!(
            attributes.get("h").unwrap().to_string(),
            "tensor<?x4xf32, #stablehlo.type_extensions<bounds = [8, ?]>>"
        );
    }

    #[test]
    fn parse_regions_and_groups() {
        let src = indoc! {r#"
        %0 = "foo.index"() : () -> tensor<i32>
        %1:2 = "stablehlo.case"(%0) ({
          %2 = "foo.value"() : () -> tensor<f32>
          "stablehlo.return"(%2, %2) : (tensor<f32>, tensor<f32>) -> ()
        }, {
          "stablehlo.return"(%0, %0) : (tensor<i32>, tensor<i32>) -> ()
        }) : (tensor<i32>) -> (tensor<f32>, tensor<f32>)
        "foo.use"(%1#1) : (tensor<f32>) -> ()
        "#};
        let module = parse(src).unwrap();
        let ops = module.ops();
        assert_eq!(ops.len(), 3);
        let case = ops[1].rd();
        assert_eq!(case.regions().len(), 2);
        assert_eq!(case.results().len(), 2);
        let region = case.region(0).unwrap();
        assert!(Arc::ptr_eq(&region.rd().parent().unwrap(), &ops[1]));
        let user = ops[2].rd();
        assert_eq!(user.operands()[0].rd().to_string(), "%1#1");
    }
}
