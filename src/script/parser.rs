//! Recursive-descent parser from tokens to statements.

use super::ast::{Arg, BinaryOp, Expr, ExprKind, Stmt, StmtKind, Target, UnaryOp};
use super::lexer::{tokenize, Token, TokenKind};
use super::value::Value;
use super::EvalError;

/// Parses a block body: a sequence of statements.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, EvalError> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut stmts = Vec::new();
    while !parser.check(&TokenKind::Eof) {
        stmts.extend(parser.statement()?);
    }
    Ok(stmts)
}

/// Parses an inline body as the implicit `return <expr>`.
pub fn parse_inline(source: &str) -> Result<Vec<Stmt>, EvalError> {
    let mut parser = Parser::new(tokenize(source)?);
    let line = parser.line();
    if parser.check(&TokenKind::Eof) {
        return Ok(vec![Stmt { kind: StmtKind::Return(None), line }]);
    }
    let expr = parser.expr_list()?;
    parser.eat(&TokenKind::Newline);
    if !parser.check(&TokenKind::Eof) {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(vec![Stmt { kind: StmtKind::Return(Some(expr)), line }])
}

static EOF: TokenKind = TokenKind::Eof;

/// Upper bound on nested expressions, operator chains and blocks.
const MAX_NESTING: usize = 100;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, loop_depth: 0, nesting: 0 }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        if self.nesting >= MAX_NESTING {
            return Err(EvalError::syntax(self.line(), "expression nested too deeply"));
        }
        self.nesting += 1;
        Ok(())
    }

    /// Runs `parse` one level deeper; chain levels taken inside are released on return.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        let nesting = self.nesting;
        self.descend()?;
        let result = parse(self);
        self.nesting = nesting;
        result
    }

    fn peek(&self) -> &TokenKind {
        self.tokens.get(self.pos).map_or(&EOF, |t| &t.kind)
    }

    fn peek_next(&self) -> &TokenKind {
        self.tokens.get(self.pos + 1).map_or(&EOF, |t| &t.kind)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> Result<(), EvalError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(context))
        }
    }

    fn unexpected(&self, wanted: &str) -> EvalError {
        EvalError::syntax(
            self.line(),
            format!("got {}, want {}", self.peek().describe(), wanted),
        )
    }

    // Statements

    fn statement(&mut self) -> Result<Vec<Stmt>, EvalError> {
        match self.peek() {
            TokenKind::If => Ok(vec![self.if_statement()?]),
            TokenKind::For => Ok(vec![self.for_statement()?]),
            TokenKind::Indent => Err(EvalError::syntax(self.line(), "unexpected indent")),
            _ => self.simple_statements(),
        }
    }

    /// One or more `;`-separated small statements terminated by a newline.
    fn simple_statements(&mut self) -> Result<Vec<Stmt>, EvalError> {
        let mut stmts = vec![self.small_statement()?];
        while self.eat(&TokenKind::Semicolon) {
            if self.check(&TokenKind::Newline) || self.check(&TokenKind::Eof) {
                break;
            }
            stmts.push(self.small_statement()?);
        }
        if !self.eat(&TokenKind::Newline) && !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("newline"));
        }
        Ok(stmts)
    }

    fn small_statement(&mut self) -> Result<Stmt, EvalError> {
        let line = self.line();
        let kind = match self.peek() {
            TokenKind::Return => {
                self.advance();
                if matches!(
                    self.peek(),
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
                ) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.expr_list()?))
                }
            }
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break | TokenKind::Continue => {
                let keyword = self.advance();
                if self.loop_depth == 0 {
                    return Err(EvalError::syntax(
                        line,
                        format!("{} not in a loop", keyword.describe()),
                    ));
                }
                if keyword == TokenKind::Break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            _ => {
                let expr = self.expr_list()?;
                let aug = match self.peek() {
                    TokenKind::PlusAssign => Some(BinaryOp::Add),
                    TokenKind::MinusAssign => Some(BinaryOp::Sub),
                    TokenKind::StarAssign => Some(BinaryOp::Mul),
                    _ => None,
                };
                if self.eat(&TokenKind::Assign) {
                    let target = to_target(expr)?;
                    StmtKind::Assign { target, value: self.expr_list()? }
                } else if let Some(op) = aug {
                    self.advance();
                    let target = to_target(expr)?;
                    if matches!(target, Target::Tuple(_)) {
                        return Err(EvalError::syntax(
                            line,
                            "augmented assignment to a tuple is not allowed",
                        ));
                    }
                    StmtKind::AugAssign { target, op, value: self.expr_list()? }
                } else {
                    StmtKind::Expr(expr)
                }
            }
        };
        Ok(Stmt { kind, line })
    }

    fn if_statement(&mut self) -> Result<Stmt, EvalError> {
        let line = self.line();
        self.advance();
        let mut branches = Vec::new();
        let condition = self.test()?;
        self.expect(&TokenKind::Colon, "':' after if condition")?;
        branches.push((condition, self.suite()?));

        let mut otherwise = Vec::new();
        loop {
            if self.eat(&TokenKind::Elif) {
                let condition = self.test()?;
                self.expect(&TokenKind::Colon, "':' after elif condition")?;
                branches.push((condition, self.suite()?));
            } else if self.eat(&TokenKind::Else) {
                self.expect(&TokenKind::Colon, "':' after else")?;
                otherwise = self.suite()?;
                break;
            } else {
                break;
            }
        }
        Ok(Stmt { kind: StmtKind::If { branches, otherwise }, line })
    }

    fn for_statement(&mut self) -> Result<Stmt, EvalError> {
        let line = self.line();
        self.advance();
        let target = self.loop_target()?;
        self.expect(&TokenKind::In, "'in' in for loop")?;
        let iter = self.expr_list()?;
        self.expect(&TokenKind::Colon, "':' after for clause")?;
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        Ok(Stmt { kind: StmtKind::For { target, iter, body: body? }, line })
    }

    fn suite(&mut self) -> Result<Vec<Stmt>, EvalError> {
        self.nested(Self::suite_body)
    }

    fn suite_body(&mut self) -> Result<Vec<Stmt>, EvalError> {
        if !self.eat(&TokenKind::Newline) {
            return self.simple_statements();
        }
        self.expect(&TokenKind::Indent, "indented block")?;
        let mut stmts = Vec::new();
        while !self.eat(&TokenKind::Dedent) {
            if self.check(&TokenKind::Eof) {
                break;
            }
            stmts.extend(self.statement()?);
        }
        Ok(stmts)
    }

    fn loop_target(&mut self) -> Result<Target, EvalError> {
        let mut targets = vec![self.loop_target_atom()?];
        let mut is_tuple = false;
        while self.eat(&TokenKind::Comma) {
            is_tuple = true;
            if self.check(&TokenKind::In) {
                break;
            }
            targets.push(self.loop_target_atom()?);
        }
        Ok(if is_tuple { Target::Tuple(targets) } else { targets.remove(0) })
    }

    fn loop_target_atom(&mut self) -> Result<Target, EvalError> {
        match self.advance() {
            TokenKind::Ident(name) => Ok(Target::Name(name)),
            TokenKind::LParen => {
                let target = self.loop_target()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(target)
            }
            other => Err(EvalError::syntax(
                self.line(),
                format!("got {}, want loop variable", other.describe()),
            )),
        }
    }

    // Expressions

    /// Comma-separated expressions; more than one (or a trailing comma) forms a tuple.
    fn expr_list(&mut self) -> Result<Expr, EvalError> {
        let line = self.line();
        let first = self.test()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !self.starts_expr() {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr { kind: ExprKind::Tuple(items), line })
    }

    fn starts_expr(&self) -> bool {
        !matches!(
            self.peek(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::Colon
                | TokenKind::Semicolon
                | TokenKind::In
        )
    }

    fn test(&mut self) -> Result<Expr, EvalError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr, EvalError> {
        let line = self.line();
        let expr = self.or_test()?;
        if !self.eat(&TokenKind::If) {
            return Ok(expr);
        }
        let condition = self.or_test()?;
        self.expect(&TokenKind::Else, "'else' in conditional expression")?;
        let otherwise = self.test()?;
        Ok(Expr {
            kind: ExprKind::Conditional {
                condition: Box::new(condition),
                then: Box::new(expr),
                otherwise: Box::new(otherwise),
            },
            line,
        })
    }

    fn or_test(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and_test()?;
        while self.check(&TokenKind::Or) {
            let line = self.line();
            self.advance();
            self.descend()?;
            let right = self.and_test()?;
            left = Expr { kind: ExprKind::Or(Box::new(left), Box::new(right)), line };
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.not_test()?;
        while self.check(&TokenKind::And) {
            let line = self.line();
            self.advance();
            self.descend()?;
            let right = self.not_test()?;
            left = Expr { kind: ExprKind::And(Box::new(left), Box::new(right)), line };
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expr, EvalError> {
        if self.check(&TokenKind::Not) {
            let line = self.line();
            self.advance();
            let operand = self.nested(Self::not_test)?;
            return Ok(Expr {
                kind: ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) },
                line,
            });
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<BinaryOp> {
        let op = match self.peek() {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::In => BinaryOp::In,
            TokenKind::Not if self.peek_next() == &TokenKind::In => {
                self.advance();
                BinaryOp::NotIn
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let left = self.arith()?;
        let line = self.line();
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        let right = self.arith()?;
        if self.comparison_op().is_some() {
            return Err(EvalError::syntax(line, "comparison operators cannot be chained"));
        }
        Ok(Expr {
            kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
            line,
        })
    }

    fn arith(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            let line = self.line();
            self.advance();
            self.descend()?;
            let right = self.term()?;
            left = Expr {
                kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                line,
            };
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            let line = self.line();
            self.advance();
            self.descend()?;
            let right = self.unary()?;
            left = Expr {
                kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                line,
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.postfix(),
        };
        let line = self.line();
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr { kind: ExprKind::Unary { op, operand: Box::new(operand) }, line })
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.atom()?;
        loop {
            let line = self.line();
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    self.descend()?;
                    let args = self.call_args()?;
                    expr = Expr { kind: ExprKind::Call { callee: Box::new(expr), args }, line };
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.descend()?;
                    expr = self.subscript(expr, line)?;
                }
                TokenKind::Dot => {
                    self.advance();
                    self.descend()?;
                    let TokenKind::Ident(name) = self.advance() else {
                        return Err(EvalError::syntax(line, "expected attribute name after '.'"));
                    };
                    expr = Expr { kind: ExprKind::Attribute { object: Box::new(expr), name }, line };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Arg>, EvalError> {
        let mut args = Vec::new();
        let mut seen_keyword = false;
        while !self.eat(&TokenKind::RParen) {
            if let (TokenKind::Ident(name), TokenKind::Assign) = (self.peek(), self.peek_next()) {
                let name = name.clone();
                self.advance();
                self.advance();
                args.push(Arg::Keyword(name, self.test()?));
                seen_keyword = true;
            } else {
                if seen_keyword {
                    return Err(EvalError::syntax(
                        self.line(),
                        "positional argument may not follow keyword argument",
                    ));
                }
                args.push(Arg::Positional(self.test()?));
            }
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RParen, "',' or ')' in call")?;
                break;
            }
        }
        Ok(args)
    }

    fn subscript(&mut self, object: Expr, line: usize) -> Result<Expr, EvalError> {
        let start = if self.check(&TokenKind::Colon) { None } else { Some(self.expr_list()?) };
        if self.eat(&TokenKind::RBracket) {
            let index = start.ok_or_else(|| self.unexpected("index expression"))?;
            return Ok(Expr {
                kind: ExprKind::Index { object: Box::new(object), index: Box::new(index) },
                line,
            });
        }
        self.expect(&TokenKind::Colon, "':' or ']' in subscript")?;
        let stop = if matches!(self.peek(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.test()?))
        };
        let step = if self.eat(&TokenKind::Colon) && !self.check(&TokenKind::RBracket) {
            Some(Box::new(self.test()?))
        } else {
            None
        };
        self.expect(&TokenKind::RBracket, "']' after slice")?;
        Ok(Expr {
            kind: ExprKind::Slice { object: Box::new(object), start: start.map(Box::new), stop, step },
            line,
        })
    }

    fn atom(&mut self) -> Result<Expr, EvalError> {
        let line = self.line();
        let kind = match self.advance() {
            TokenKind::Int(i) => ExprKind::Literal(Value::Int(i)),
            TokenKind::Float(f) => ExprKind::Literal(Value::Float(f)),
            TokenKind::Str(s) => {
                let mut s = s;
                // Adjacent string literals concatenate.
                while let TokenKind::Str(next) = self.peek() {
                    s.push_str(next);
                    self.advance();
                }
                ExprKind::Literal(Value::String(s))
            }
            TokenKind::None => ExprKind::Literal(Value::None),
            TokenKind::True => ExprKind::Literal(Value::Bool(true)),
            TokenKind::False => ExprKind::Literal(Value::Bool(false)),
            TokenKind::Ident(name) => ExprKind::Name(name),
            TokenKind::LParen => return self.paren(line),
            TokenKind::LBracket => return self.list(line),
            TokenKind::LBrace => return self.dict(line),
            other => {
                return Err(EvalError::syntax(
                    line,
                    format!("got {}, want primary expression", other.describe()),
                ))
            }
        };
        Ok(Expr { kind, line })
    }

    fn paren(&mut self, line: usize) -> Result<Expr, EvalError> {
        if self.eat(&TokenKind::RParen) {
            return Ok(Expr { kind: ExprKind::Tuple(Vec::new()), line });
        }
        let expr = self.expr_list()?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(expr)
    }

    fn list(&mut self, line: usize) -> Result<Expr, EvalError> {
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr { kind: ExprKind::List(Vec::new()), line });
        }
        let first = self.test()?;
        if self.eat(&TokenKind::For) {
            let target = self.loop_target()?;
            self.expect(&TokenKind::In, "'in' in comprehension")?;
            let iter = self.or_test()?;
            let condition =
                if self.eat(&TokenKind::If) { Some(Box::new(self.or_test()?)) } else { None };
            self.expect(&TokenKind::RBracket, "']' after comprehension")?;
            return Ok(Expr {
                kind: ExprKind::ListComp {
                    element: Box::new(first),
                    target,
                    iter: Box::new(iter),
                    condition,
                },
                line,
            });
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect(&TokenKind::RBracket, "',' or ']' in list")?;
        Ok(Expr { kind: ExprKind::List(items), line })
    }

    fn dict(&mut self, line: usize) -> Result<Expr, EvalError> {
        let mut entries = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let key = self.test()?;
            self.expect(&TokenKind::Colon, "':' in dict entry")?;
            let value = self.test()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) {
                self.expect(&TokenKind::RBrace, "',' or '}' in dict")?;
                break;
            }
        }
        Ok(Expr { kind: ExprKind::Dict(entries), line })
    }
}

fn to_target(expr: Expr) -> Result<Target, EvalError> {
    match expr.kind {
        ExprKind::Name(name) => Ok(Target::Name(name)),
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            items.into_iter().map(to_target).collect::<Result<Vec<_>, _>>().map(Target::Tuple)
        }
        ExprKind::Index { object, index } => match object.kind {
            ExprKind::Name(name) => Ok(Target::Index { name, index }),
            _ => Err(EvalError::syntax(expr.line, "can only assign to an element of a variable")),
        },
        _ => Err(EvalError::syntax(expr.line, "invalid assignment target")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_becomes_return() {
        let stmts = parse_inline("1, 2").unwrap();
        assert_eq!(stmts.len(), 1);
        match &stmts[0].kind {
            StmtKind::Return(Some(Expr { kind: ExprKind::Tuple(items), .. })) => {
                assert_eq!(items.len(), 2)
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_conditional_expression() {
        let stmts = parse_inline("'a' if x else 'b'").unwrap();
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Return(Some(Expr { kind: ExprKind::Conditional { .. }, .. }))
        ));
    }

    #[test]
    fn test_block_statements() {
        let stmts = parse_program("x = 1\nif x:\n    x += 1\nelse:\n    pass\nreturn x\n").unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[2].line, 6);
    }

    #[test]
    fn test_break_outside_loop() {
        let err = parse_program("break").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.msg.contains("not in a loop"));
    }

    #[test]
    fn test_chained_comparison_rejected() {
        assert!(parse_inline("1 < 2 < 3").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = parse_inline(&source).unwrap_err();
        assert!(err.msg.ends_with("expression nested too deeply"));

        let chain = vec!["1"; 10_000].join(" + ");
        assert!(parse_inline(&chain).is_err());
        let negations = format!("{}1", "-".repeat(100_000));
        assert!(parse_inline(&negations).is_err());

        let nested = format!("{}1{}", "[".repeat(50), "]".repeat(50));
        assert!(parse_inline(&nested).is_ok());
    }

    #[test]
    fn test_syntax_error_line() {
        let err = parse_program("x = 1\ny = (\n").unwrap_err();
        assert!(err.line >= 2);
    }
}
