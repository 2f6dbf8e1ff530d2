//! Recursive descent over the token stream.
//!
//! Precedence, loosest first: conditional, `or`, `and`, `not`, comparisons,
//! `|`, `&`, shifts, `+ -`, `* / // %`, unary `- ~`, `**`, then calls and
//! subscripts.

use error_stack::bail;

use crate::parser::lexer::TokenStream;
use crate::parser::token::Token;
use crate::parser::ParseError;
use crate::{
    Arguments, BinaryOp, BoolOp, CompareOp, Expr, ExprKind, Located, Location, Stmt, UnaryOp,
};

type Result<T> = error_stack::Result<T, ParseError>;

pub(crate) struct Parser<'input> {
    tokens: TokenStream<'input>,
}

impl<'input> Parser<'input> {
    pub(crate) fn new(input: &'input str) -> Result<Self> {
        Ok(Self {
            tokens: TokenStream::new(input)?,
        })
    }

    /// `program := sep* (statement (sep+ statement)*)? sep*`
    pub(crate) fn statements(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            while self.eat_separator() {}
            if self.tokens.peek().is_none() {
                return Ok(statements);
            }
            statements.push(self.statement()?);
            if self.tokens.peek().is_some() && !self.eat_separator() {
                return Err(self.tokens.unexpected("';' or newline"));
            }
        }
    }

    /// A single expression spanning the whole input.
    pub(crate) fn single_expr(&mut self) -> Result<Expr> {
        let expr = self.tuple()?;
        if self.tokens.peek().is_some() {
            return Err(self.tokens.unexpected("end of expression"));
        }
        Ok(expr)
    }

    fn eat_separator(&mut self) -> bool {
        self.tokens.eat(&Token::SymSemicolon).is_some() || self.tokens.eat(&Token::Newline).is_some()
    }

    fn statement(&mut self) -> Result<Stmt> {
        let is_assignment = matches!(
            (self.tokens.peek(), self.tokens.peek_nth(1)),
            (Some(Token::Ident(_)), Some(Token::SymEquals))
        );

        let statement = if is_assignment {
            let (name, location) = self.name()?;
            self.tokens.expect(&Token::SymEquals, "'='")?;
            let value = self.tuple()?;
            Stmt::Assign {
                target: Located::new(name, location),
                value,
            }
        } else {
            Stmt::Expr(self.tuple()?)
        };

        if let Some(location) = self.tokens.eat(&Token::SymEquals) {
            bail!(ParseError::Unsupported {
                what: "assignment target must be a single name",
                location,
            });
        }
        Ok(statement)
    }

    fn name(&mut self) -> Result<(String, Location)> {
        match self.tokens.peek() {
            Some(Token::Ident(_)) => match self.tokens.next() {
                Some((Token::Ident(name), location)) => Ok((name.to_owned(), location)),
                _ => Err(self.tokens.unexpected("name")),
            },
            _ => Err(self.tokens.unexpected("name")),
        }
    }

    /// `tuple := expr (',' expr)* ','?`
    fn tuple(&mut self) -> Result<Expr> {
        let first = self.expr()?;
        if self.tokens.peek() != Some(&Token::SymComma) {
            return Ok(first);
        }

        let mut location = *first.location();
        let mut elements = vec![first];
        while self.tokens.eat(&Token::SymComma).is_some() {
            if !self.starts_expr() {
                break;
            }
            let element = self.expr()?;
            location = location.to(element.location());
            elements.push(element);
        }
        Ok(Expr::new(ExprKind::Tuple(elements), location))
    }

    fn starts_expr(&mut self) -> bool {
        matches!(
            self.tokens.peek(),
            Some(
                Token::Ident(_)
                    | Token::Literal(_)
                    | Token::SymLParen
                    | Token::SymLBrack
                    | Token::SymMinus
                    | Token::SymTilde
                    | Token::KwNot
            )
        )
    }

    /// `expr := or_expr ('if' or_expr 'else' expr)?`
    fn expr(&mut self) -> Result<Expr> {
        let then = self.or_expr()?;
        if self.tokens.eat(&Token::KwIf).is_none() {
            return Ok(then);
        }
        let test = self.or_expr()?;
        self.tokens.expect(&Token::KwElse, "'else'")?;
        let otherwise = self.expr()?;
        let location = then.location().to(otherwise.location());
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            location,
        ))
    }

    fn or_expr(&mut self) -> Result<Expr> {
        self.bool_chain(BoolOp::Or, &Token::KwOr, Self::and_expr)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        self.bool_chain(BoolOp::And, &Token::KwAnd, Self::not_expr)
    }

    fn bool_chain(
        &mut self,
        op: BoolOp,
        separator: &Token<'static>,
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let first = operand(self)?;
        if self.tokens.peek() != Some(separator) {
            return Ok(first);
        }

        let mut location = *first.location();
        let mut operands = vec![first];
        while self.tokens.eat(separator).is_some() {
            let next = operand(self)?;
            location = location.to(next.location());
            operands.push(next);
        }
        Ok(Expr::new(ExprKind::Bool { op, operands }, location))
    }

    fn not_expr(&mut self) -> Result<Expr> {
        match self.tokens.eat(&Token::KwNot) {
            Some(location) => {
                let operand = self.not_expr()?;
                Ok(unary(UnaryOp::Not, operand, location))
            }
            None => self.comparison(),
        }
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.tokens.peek()? {
            Token::SymDoubleEquals => CompareOp::Eq,
            Token::SymNeq => CompareOp::NotEq,
            Token::SymLt => CompareOp::Lt,
            Token::SymLte => CompareOp::LtE,
            Token::SymGt => CompareOp::Gt,
            Token::SymGte => CompareOp::GtE,
            Token::KwIn => CompareOp::In,
            Token::KwNot if self.tokens.peek_nth(1) == Some(&Token::KwIn) => CompareOp::NotIn,
            _ => return None,
        };
        self.tokens.next();
        if op == CompareOp::NotIn {
            self.tokens.next();
        }
        Some(op)
    }

    /// `comparison := bit_or (compare_op bit_or)?`
    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.bit_or()?;
        let Some(op) = self.compare_op() else {
            return Ok(lhs);
        };
        let rhs = self.bit_or()?;

        let location = self.tokens.location();
        if self.compare_op().is_some() {
            bail!(ParseError::Unsupported {
                what: "chained comparisons are not supported",
                location,
            });
        }

        let location = lhs.location().to(rhs.location());
        Ok(Expr::new(
            ExprKind::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            location,
        ))
    }

    fn bit_or(&mut self) -> Result<Expr> {
        self.binary_chain(Self::bit_and, |token| match token {
            Token::SymPipe => Some(BinaryOp::BitOr),
            _ => None,
        })
    }

    fn bit_and(&mut self) -> Result<Expr> {
        self.binary_chain(Self::shift, |token| match token {
            Token::SymAmpersand => Some(BinaryOp::BitAnd),
            _ => None,
        })
    }

    fn shift(&mut self) -> Result<Expr> {
        self.binary_chain(Self::arith, |token| match token {
            Token::SymShiftLeft => Some(BinaryOp::LShift),
            Token::SymShiftRight => Some(BinaryOp::RShift),
            _ => None,
        })
    }

    fn arith(&mut self) -> Result<Expr> {
        self.binary_chain(Self::term, |token| match token {
            Token::SymPlus => Some(BinaryOp::Add),
            Token::SymMinus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_chain(Self::factor, |token| match token {
            Token::SymStar => Some(BinaryOp::Mul),
            Token::SymSlash => Some(BinaryOp::Div),
            Token::SymDoubleSlash => Some(BinaryOp::FloorDiv),
            Token::SymPercent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    /// Left-associative chain of binary operators at one precedence level.
    fn binary_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr>,
        operator: fn(&Token<'_>) -> Option<BinaryOp>,
    ) -> Result<Expr> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.tokens.peek().and_then(operator) {
            self.tokens.next();
            let rhs = operand(self)?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// `factor := ('-' | '~') factor | power`
    fn factor(&mut self) -> Result<Expr> {
        if let Some(location) = self.tokens.eat(&Token::SymMinus) {
            let operand = self.factor()?;
            Ok(unary(UnaryOp::Neg, operand, location))
        } else if let Some(location) = self.tokens.eat(&Token::SymTilde) {
            let operand = self.factor()?;
            Ok(unary(UnaryOp::Invert, operand, location))
        } else {
            self.power()
        }
    }

    /// `power := postfix ('**' factor)?`
    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.tokens.eat(&Token::SymDoubleStar).is_none() {
            return Ok(base);
        }
        let exponent = self.factor()?;
        Ok(binary(BinaryOp::Pow, base, exponent))
    }

    /// `postfix := atom ('(' arguments ')' | '[' expr ']')*`
    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.atom()?;
        loop {
            if let Some(open) = self.tokens.eat(&Token::SymLParen) {
                let function = match expr.kind() {
                    ExprKind::Name(name) => Located::new(name.clone(), *expr.location()),
                    _ => bail!(ParseError::Unsupported {
                        what: "only named functions may be called",
                        location: open,
                    }),
                };
                let args = self.arguments()?;
                let close = self.tokens.expect(&Token::SymRParen, "')'")?;
                let location = expr.location().to(&close);
                expr = Expr::new(ExprKind::Call { function, args }, location);
            } else if self.tokens.eat(&Token::SymLBrack).is_some() {
                let index = self.tuple()?;
                let close = self.tokens.expect(&Token::SymRBrack, "']'")?;
                let location = expr.location().to(&close);
                expr = Expr::new(
                    ExprKind::Subscript {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    location,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// `arguments := (argument (',' argument)* ','?)?`
    fn arguments(&mut self) -> Result<Arguments> {
        let mut positional = Vec::new();
        let mut keyword = Vec::new();
        while self.tokens.peek() != Some(&Token::SymRParen) {
            let location = self.tokens.location();
            match (self.tokens.peek(), self.tokens.peek_nth(1)) {
                (Some(Token::SymStar | Token::SymDoubleStar), _) => {
                    bail!(ParseError::Unsupported {
                        what: "* and ** are not supported in function calls",
                        location,
                    })
                }
                (Some(Token::Ident(_)), Some(Token::SymEquals)) => {
                    let (name, location) = self.name()?;
                    self.tokens.next();
                    let value = self.expr()?;
                    keyword.push((Located::new(name, location), value));
                }
                _ => {
                    if !keyword.is_empty() {
                        bail!(ParseError::Unsupported {
                            what: "positional argument follows keyword argument",
                            location,
                        });
                    }
                    positional.push(self.expr()?);
                }
            }

            if self.tokens.eat(&Token::SymComma).is_none() {
                break;
            }
        }
        Ok(Arguments::new(positional, keyword))
    }

    fn atom(&mut self) -> Result<Expr> {
        let Some((token, location)) = self.tokens.next() else {
            return Err(self.tokens.unexpected("expression"));
        };
        match token {
            Token::Ident(name) => Ok(Expr::new(ExprKind::Name(name.to_owned()), location)),
            Token::Literal(literal) => Ok(Expr::new(ExprKind::Literal(literal), location)),
            Token::SymLParen => {
                if let Some(close) = self.tokens.eat(&Token::SymRParen) {
                    return Ok(Expr::new(ExprKind::Tuple(vec![]), location.to(&close)));
                }
                let inner = self.tuple()?;
                self.tokens.expect(&Token::SymRParen, "')'")?;
                Ok(inner)
            }
            Token::SymLBrack => {
                let mut elements = Vec::new();
                while self.tokens.peek() != Some(&Token::SymRBrack) {
                    elements.push(self.expr()?);
                    if self.tokens.eat(&Token::SymComma).is_none() {
                        break;
                    }
                }
                let close = self.tokens.expect(&Token::SymRBrack, "']'")?;
                Ok(Expr::new(ExprKind::List(elements), location.to(&close)))
            }
            token => Err(error_stack::report!(ParseError::UnexpectedToken {
                found: token.to_string(),
                expected: "expression",
                location,
            })),
        }
    }
}

fn unary(op: UnaryOp, operand: Expr, location: Location) -> Expr {
    let location = location.to(operand.location());
    Expr::new(
        ExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
        location,
    )
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let location = lhs.location().to(rhs.location());
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        location,
    )
}
