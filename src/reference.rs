//! Static dialect reference data
//!
//! The reserved-keyword set and the system-column set consulted by the
//! identifier sanitizer and the DDL generator. These are fixed enumerable
//! lists, not derived logic.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Amazon Redshift reserved words (the dialect grammar's keyword list).
/// Stored upper-case; membership checks upper-case the candidate.
const RESERVED_WORDS: &[&str] = &[
    "AES128", "AES256", "ALL", "ALLOWOVERWRITE", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY",
    "AS", "ASC", "AUTHORIZATION", "BACKUP", "BETWEEN", "BINARY", "BLANKSASNULL", "BOTH",
    "BYTEDICT", "BZIP2", "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE",
    "CREDENTIALS", "CROSS", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "CURRENT_USER_ID", "DEFAULT", "DEFERRABLE", "DEFLATE", "DEFRAG", "DELTA", "DELTA32K",
    "DESC", "DISABLE", "DISTINCT", "DO", "ELSE", "EMPTYASNULL", "ENABLE", "ENCODE", "ENCRYPT",
    "ENCRYPTION", "END", "EXCEPT", "EXPLICIT", "FALSE", "FOR", "FOREIGN", "FREEZE", "FROM",
    "FULL", "GLOBALDICT256", "GLOBALDICT64K", "GRANT", "GROUP", "GZIP", "HAVING", "IDENTITY",
    "IGNORE", "ILIKE", "IN", "INITIALLY", "INNER", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "LANGUAGE", "LEADING", "LEFT", "LIKE", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "LUN",
    "LUNS", "LZO", "LZOP", "MINUS", "MOSTLY16", "MOSTLY32", "MOSTLY8", "NATURAL", "NEW", "NOT",
    "NOTNULL", "NULL", "NULLS", "OFF", "OFFLINE", "OFFSET", "OID", "OLD", "ON", "ONLY", "OPEN",
    "OR", "ORDER", "OUTER", "OVERLAPS", "PARALLEL", "PARTITION", "PERCENT", "PERMISSIONS",
    "PLACING", "PRIMARY", "RAW", "READRATIO", "RECOVER", "REFERENCES", "RESPECT", "REJECTLOG",
    "RESORT", "RESTORE", "RIGHT", "SELECT", "SESSION_USER", "SIMILAR", "SNAPSHOT", "SOME",
    "SYSDATE", "SYSTEM", "TABLE", "TAG", "TDES", "TEXT255", "TEXT32K", "THEN", "TIMESTAMP",
    "TO", "TOP", "TRAILING", "TRUE", "TRUNCATECOLUMNS", "UNION", "UNIQUE", "USER", "USING",
    "VERBOSE", "WALLET", "WHEN", "WHERE", "WITH", "WITHOUT",
];

/// Warehouse-managed metadata column names. A user column with one of these
/// names would shadow the hidden column, so it must be renamed. Stored
/// lower-case; membership checks lower-case the candidate.
const SYSTEM_COLUMNS: &[&str] = &["oid", "tableoid", "xmin", "cmin", "xmax", "cmax", "ctid"];

static RESERVED_WORD_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| RESERVED_WORDS.iter().copied().collect());

static SYSTEM_COLUMN_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SYSTEM_COLUMNS.iter().copied().collect());

/// Check whether an identifier is a reserved word in the warehouse dialect
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORD_SET.contains(word.to_uppercase().as_str())
}

/// Check whether a column name collides with a warehouse system column
pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMN_SET.contains(name.to_lowercase().as_str())
}
