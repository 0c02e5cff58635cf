use crate::{
    ast::{BinaryOp, Expr, Statement},
    error::{parser_error, Result},
    tokenizer::{Token, TokenType},
};

const UNARY_PRECEDENCE: u8 = 4;

/// Deepest nesting accepted in one statement, counting both parser recursion
/// (parentheses, unary minus, nested statements) and expression tree height.
/// The evaluator recurses over the same tree, so this bounds its stack too.
pub const MAX_DEPTH: usize = 256;

/// Parses exactly one statement. The token slice must be terminated by `EOF`
/// and every token before it has to belong to the statement.
pub fn parse(tokens: &[Token]) -> Result<Statement> {
    match tokens.last() {
        Some(token) if token.token_type == TokenType::EOF => {}
        Some(token) => return parser_error("Token stream must end with EOF", token.line),
        None => return parser_error("Token stream must end with EOF", 1),
    }

    let (statement, consumed) = parse_statement(tokens, 0)?;

    if tokens[consumed].token_type != TokenType::EOF {
        return parser_error(
            &format!("Unexpected {}", describe(&tokens[consumed])),
            tokens[consumed].line,
        );
    }

    Ok(statement)
}

fn check_depth(depth: usize, token: &Token) -> Result<()> {
    if depth > MAX_DEPTH {
        parser_error("Expression nested too deeply", token.line)
    } else {
        Ok(())
    }
}

fn parse_statement(tokens: &[Token], depth: usize) -> Result<(Statement, usize)> {
    check_depth(depth, &tokens[0])?;

    match &tokens[0].token_type {
        // The empty statement is only ever followed by a terminator
        TokenType::EOF | TokenType::Else | TokenType::EndIf | TokenType::EndWhile => {
            Ok((Statement::Empty, 0))
        }
        TokenType::If => parse_if(tokens, depth),
        TokenType::While => parse_while(tokens, depth),
        TokenType::Name(_) if tokens[1].token_type == TokenType::Equal => {
            parse_assign(tokens, depth)
        }
        _ => {
            let (expr, consumed, _) = parse_expression(tokens, 0, depth)?;
            Ok((Statement::Expression(expr), consumed))
        }
    }
}

fn parse_assign(tokens: &[Token], depth: usize) -> Result<(Statement, usize)> {
    let name = match &tokens[0].token_type {
        TokenType::Name(name) => name.clone(),
        _ => return parser_error("Expected variable name", tokens[0].line),
    };
    let consumed = 2; // Skip name and '='

    // A string literal is only valid as the whole right-hand side
    if let TokenType::String(s) = &tokens[consumed].token_type {
        return Ok((
            Statement::Assign {
                name,
                value: Expr::Str(s.clone()),
            },
            consumed + 1,
        ));
    }

    let (value, value_consumed, _) = parse_expression(&tokens[consumed..], 0, depth + 1)?;

    Ok((Statement::Assign { name, value }, consumed + value_consumed))
}

fn parse_if(tokens: &[Token], depth: usize) -> Result<(Statement, usize)> {
    let mut consumed = 1; // Skip 'if'

    let (condition, cond_consumed, _) = parse_expression(&tokens[consumed..], 0, depth + 1)?;
    consumed += cond_consumed;

    consumed += expect(&tokens[consumed..], TokenType::Then, "after if condition")?;

    let (then_branch, then_consumed) = parse_statement(&tokens[consumed..], depth + 1)?;
    consumed += then_consumed;

    let else_branch = if tokens[consumed].token_type == TokenType::Else {
        consumed += 1;
        let (branch, else_consumed) = parse_statement(&tokens[consumed..], depth + 1)?;
        consumed += else_consumed;
        Some(Box::new(branch))
    } else {
        None
    };

    consumed += expect(&tokens[consumed..], TokenType::EndIf, "to close if")?;

    Ok((
        Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        },
        consumed,
    ))
}

fn parse_while(tokens: &[Token], depth: usize) -> Result<(Statement, usize)> {
    let mut consumed = 1; // Skip 'while'

    let (condition, cond_consumed, _) = parse_expression(&tokens[consumed..], 0, depth + 1)?;
    consumed += cond_consumed;

    consumed += expect(&tokens[consumed..], TokenType::Do, "after while condition")?;

    let (body, body_consumed) = parse_statement(&tokens[consumed..], depth + 1)?;
    consumed += body_consumed;

    consumed += expect(&tokens[consumed..], TokenType::EndWhile, "to close while")?;

    Ok((
        Statement::While {
            condition,
            body: Box::new(body),
        },
        consumed,
    ))
}

/// Returns the expression, the tokens consumed and the height of the tree.
fn parse_expression(
    tokens: &[Token],
    precedence: u8,
    depth: usize,
) -> Result<(Expr, usize, usize)> {
    check_depth(depth, &tokens[0])?;

    // Parse prefix expression
    let (mut left, mut consumed, mut height) = parse_prefix(tokens, depth)?;

    // Parse infix expressions while precedence allows
    loop {
        let operator = match binary_operator(&tokens[consumed].token_type) {
            Some(operator) => operator,
            None => break,
        };

        let op_precedence = get_precedence(operator);
        if precedence >= op_precedence {
            break;
        }

        // Right side binds at the operator's own level, so equal operators associate left
        let (right, right_consumed, right_height) =
            parse_expression(&tokens[consumed + 1..], op_precedence, depth + 1)?;

        // Long operator chains grow the tree without recursing here
        height = height.max(right_height) + 1;
        check_depth(height, &tokens[consumed])?;

        left = Expr::binary(left, operator, right);
        consumed += 1 + right_consumed;
    }

    Ok((left, consumed, height))
}

fn parse_prefix(tokens: &[Token], depth: usize) -> Result<(Expr, usize, usize)> {
    match &tokens[0].token_type {
        TokenType::Number(n) => Ok((Expr::Number(*n), 1, 1)),
        TokenType::Name(name) => Ok((Expr::Variable(name.clone()), 1, 1)),
        TokenType::LeftParen => {
            let mut consumed = 1; // Skip '('

            let (expr, expr_consumed, height) =
                parse_expression(&tokens[consumed..], 0, depth + 1)?;
            consumed += expr_consumed;

            consumed += expect(&tokens[consumed..], TokenType::RightParen, "after expression")?;

            Ok((expr, consumed, height))
        }
        TokenType::Minus => {
            let (operand, operand_consumed, height) =
                parse_expression(&tokens[1..], UNARY_PRECEDENCE, depth + 1)?;
            Ok((Expr::Negate(Box::new(operand)), operand_consumed + 1, height + 1))
        }
        TokenType::String(_) => parser_error(
            "String literals are only allowed as the value of an assignment",
            tokens[0].line,
        ),
        _ => parser_error(
            &format!("Expected expression, found {}", describe(&tokens[0])),
            tokens[0].line,
        ),
    }
}

fn binary_operator(token: &TokenType) -> Option<BinaryOp> {
    match token {
        TokenType::Plus => Some(BinaryOp::Add),
        TokenType::Minus => Some(BinaryOp::Subtract),
        TokenType::Star => Some(BinaryOp::Multiply),
        TokenType::Slash => Some(BinaryOp::Divide),
        TokenType::Less => Some(BinaryOp::Less),
        TokenType::Greater => Some(BinaryOp::Greater),
        _ => None,
    }
}

fn get_precedence(operator: BinaryOp) -> u8 {
    match operator {
        BinaryOp::Multiply | BinaryOp::Divide => 3,
        BinaryOp::Add | BinaryOp::Subtract => 2,
        BinaryOp::Less | BinaryOp::Greater => 1,
    }
}

fn expect(tokens: &[Token], expected: TokenType, context: &str) -> Result<usize> {
    if tokens[0].token_type == expected {
        Ok(1)
    } else {
        parser_error(
            &format!(
                "Expected '{}' {}, found {}",
                expected,
                context,
                describe(&tokens[0])
            ),
            tokens[0].line,
        )
    }
}

fn describe(token: &Token) -> String {
    match token.token_type {
        TokenType::EOF => "end of input".to_string(),
        _ => format!("'{}'", token.token_type),
    }
}
