//! `where` clause validator
//!
//! Rejects injection-shaped input before a clause ever reaches the filter
//! compiler, then parses what is left as a single SQL expression.
//! Rules are applied in order (Chain of Responsibility).

use crate::core::{StoreError, StoreResult};
use sqlparser::ast::Expr as SqlExpr;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// Trait for validation rules (Chain of Responsibility pattern)
///
/// Rules see the tokenized clause, so string literals and identifiers that
/// merely contain a keyword are never mistaken for the keyword itself.
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, tokens: &[Token]) -> StoreResult<()>;
}

/// Rejects statement keywords that never belong in a filter
#[derive(Debug, Clone, Default)]
pub struct DangerousKeywordRule;

impl DangerousKeywordRule {
    const KEYWORDS: [&'static str; 16] = [
        "select", "insert", "update", "delete", "drop", "truncate", "alter", "create",
        "grant", "revoke", "exec", "execute", "union", "into", "outfile", "dumpfile",
    ];

    const FUNCTIONS: [&'static str; 1] = ["load_file"];

    /// Stored procedure prefixes (`xp_cmdshell`, `sp_executesql`)
    const PROCEDURE_PREFIXES: [&'static str; 2] = ["xp_", "sp_"];

    /// Function and procedure names count only when followed by `(`
    fn is_dangerous_call(word: &str) -> bool {
        Self::FUNCTIONS.contains(&word)
            || Self::PROCEDURE_PREFIXES.iter().any(|prefix| word.starts_with(prefix))
    }
}

fn next_significant(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().find(|token| !matches!(token, Token::Whitespace(_)))
}

impl ValidationRule for DangerousKeywordRule {
    fn name(&self) -> &'static str {
        "DANGEROUS_KEYWORD"
    }

    fn validate(&self, tokens: &[Token]) -> StoreResult<()> {
        for (i, token) in tokens.iter().enumerate() {
            // Quoted identifiers are field names, whatever they spell
            let Token::Word(word) = token else { continue };
            if word.quote_style.is_some() {
                continue;
            }

            let lower = word.value.to_lowercase();
            let dangerous = Self::KEYWORDS.contains(&lower.as_str())
                || (Self::is_dangerous_call(&lower)
                    && next_significant(&tokens[i + 1..]) == Some(&Token::LParen));

            if dangerous {
                return Err(StoreError::SqlInjection(format!(
                    "Dangerous keyword detected: {}",
                    lower
                )));
            }
        }

        Ok(())
    }
}

/// Rejects comments, which are only useful for cutting a clause short
#[derive(Debug, Clone, Default)]
pub struct CommentRule;

impl ValidationRule for CommentRule {
    fn name(&self) -> &'static str {
        "COMMENT"
    }

    fn validate(&self, tokens: &[Token]) -> StoreResult<()> {
        let has_comment = tokens.iter().any(|token| {
            matches!(
                token,
                Token::Whitespace(Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_))
            )
        });

        if has_comment {
            return Err(StoreError::SqlInjection(
                "SQL comments are not allowed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rejects statement chaining
#[derive(Debug, Clone, Default)]
pub struct StatementChainRule;

impl ValidationRule for StatementChainRule {
    fn name(&self) -> &'static str {
        "STATEMENT_CHAIN"
    }

    fn validate(&self, tokens: &[Token]) -> StoreResult<()> {
        if tokens.contains(&Token::SemiColon) {
            return Err(StoreError::SqlInjection(
                "Multiple statements (semicolons) are not allowed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validates and parses `where` clauses
pub struct WhereClauseValidator {
    rules: Vec<Box<dyn ValidationRule>>,
    dialect: GenericDialect,
}

impl WhereClauseValidator {
    /// Create validator with default rules
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(CommentRule),
            Box::new(StatementChainRule),
            Box::new(DangerousKeywordRule),
        ])
    }

    /// Create validator with custom rules
    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self {
            rules,
            dialect: GenericDialect {},
        }
    }

    /// Tokenize the clause and run every rule against the tokens
    ///
    /// A clause the tokenizer rejects (an unterminated string, say) is an
    /// invalid query rather than an injection.
    pub fn check(&self, clause: &str) -> StoreResult<()> {
        let tokens = Tokenizer::new(&self.dialect, clause)
            .tokenize()
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;

        for rule in &self.rules {
            if let Err(err) = rule.validate(&tokens) {
                log::debug!("where clause rejected by rule {}: {}", rule.name(), err);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Parse a clause as exactly one expression
    ///
    /// Trailing tokens after the expression are an error: `a = 1 b` is not
    /// silently truncated to `a = 1`.
    pub fn parse(&self, clause: &str) -> StoreResult<SqlExpr> {
        let mut parser = Parser::new(&self.dialect)
            .try_with_sql(clause)
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;

        let expr = parser
            .parse_expr()
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;

        let next = parser.peek_token();
        if next.token != Token::EOF {
            return Err(StoreError::InvalidQuery(format!(
                "Unexpected token after condition: {}",
                next.token
            )));
        }

        Ok(expr)
    }

    /// Check, then parse
    pub fn validate(&self, clause: &str) -> StoreResult<SqlExpr> {
        self.check(clause)?;
        self.parse(clause)
    }
}

impl Default for WhereClauseValidator {
    fn default() -> Self {
        Self::new()
    }
}
