use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Extensions accepted as filenames by every heuristic
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "cxx", "hh", "hpp", "hxx"];

/// Regex fragment matching a filename token with a recognized extension.
/// Longer extensions come first so `foo.cpp` is not cut at `foo.c`.
pub const FILENAME_PATTERN: &str =
    r"[A-Za-z0-9_][A-Za-z0-9_\-./]*\.(?i:cpp|cxx|hpp|hxx|cc|hh|c|h)\b";

pub const DEFAULT_HEADER_FILE: &str = "main.h";
pub const DEFAULT_IMPLEMENTATION_FILE: &str = "main.c";

/// Identifier -> file that conventionally defines it.
/// Evaluated top to bottom; the first identifier present in a body wins.
const BUILTIN_SIGNATURES: &[(&str, &str)] = &[
    ("Z_TagMalloc", "zone.c"),
    ("Z_Malloc", "zone.c"),
    ("Z_Free", "zone.c"),
    ("Hunk_AllocName", "zone.c"),
    ("Hunk_Alloc", "zone.c"),
    ("Cache_Alloc", "zone.c"),
    ("Cbuf_AddText", "cmd.c"),
    ("Cbuf_Execute", "cmd.c"),
    ("Cmd_AddCommand", "cmd.c"),
    ("Cmd_Argv", "cmd.c"),
    ("Cvar_RegisterVariable", "cvar.c"),
    ("Cvar_SetValue", "cvar.c"),
    ("Cvar_VariableValue", "cvar.c"),
    ("COM_LoadFile", "common.c"),
    ("COM_Parse", "common.c"),
    ("MSG_WriteByte", "common.c"),
    ("MSG_ReadByte", "common.c"),
    ("SZ_Alloc", "common.c"),
    ("Con_Printf", "console.c"),
    ("Con_DPrintf", "console.c"),
    ("Host_Frame", "host.c"),
    ("Host_Init", "host.c"),
    ("Host_Error", "host.c"),
    ("SV_SpawnServer", "sv_main.c"),
    ("SV_Physics", "sv_phys.c"),
    ("CL_SendCmd", "cl_main.c"),
    ("CL_ParseServerMessage", "cl_parse.c"),
    ("R_RenderView", "r_main.c"),
    ("PR_ExecuteProgram", "pr_exec.c"),
    ("ED_Alloc", "pr_edict.c"),
    ("S_StartSound", "snd_dma.c"),
    ("Mod_ForName", "model.c"),
    ("NET_SendMessage", "net_main.c"),
    ("Key_Event", "keys.c"),
    ("SCR_UpdateScreen", "screen.c"),
    ("V_RenderView", "view.c"),
    ("W_GetLumpName", "wad.c"),
    ("AngleVectors", "mathlib.c"),
    ("Draw_Character", "draw.c"),
    ("M_Menu_Main_f", "menu.c"),
    ("SV_Move", "world.c"),
];

/// Structural hints that a body is a header. Each pattern counts once.
const HEADER_INDICATORS: &[&str] = &[
    r"(?m)^[ \t]*#[ \t]*ifndef[ \t]+\w+",
    r"(?m)^[ \t]*#[ \t]*define[ \t]+\w*_H(?:PP|XX)?_*\b",
    r"(?m)^[ \t]*#[ \t]*pragma[ \t]+once\b",
    r"\btypedef[ \t]+struct\b",
    r"\btypedef[ \t]+enum\b",
];

/// Structural hints that a body is an implementation file. Each pattern counts once.
const IMPLEMENTATION_INDICATORS: &[&str] = &[
    // function definition: signature at column 0, brace on the same or next line
    r"(?m)^[A-Za-z_][\w \t\*]*\b\w+[ \t]*\([^;{}()]*\)[ \t]*(?:\r?\n[ \t]*)?\{",
    r#"(?m)^[ \t]*#[ \t]*include[ \t]+"[^"]+\.(?i:c|cc|cpp|cxx)""#,
];

/// Returns true when `name` ends in one of the recognized source extensions.
pub fn is_source_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOURCE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// A pattern whose presence anywhere in a body attributes it to `filename`.
#[derive(Debug, Clone)]
pub struct SignatureRule {
    pub pattern: Regex,
    pub filename: String,
}

impl SignatureRule {
    pub fn new(pattern: &str, filename: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            filename: filename.into(),
        })
    }

    /// Rule matching a call or definition of `identifier`, e.g. `Z_Free (`
    pub fn for_identifier(identifier: &str, filename: impl Into<String>) -> Self {
        let pattern = format!(r"\b{}\s*\(", regex::escape(identifier));
        Self {
            pattern: Regex::new(&pattern).expect("escaped identifier is a valid regex"),
            filename: filename.into(),
        }
    }

    pub fn matches(&self, body: &str) -> bool {
        self.pattern.is_match(body)
    }
}

/// The read-only tables consulted by the content classifier and attributor.
///
/// The built-in set is built once per process (see [`RuleSet::builtin`]);
/// custom sets come from the rules file registry and are passed around by reference.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub signatures: Vec<SignatureRule>,
    pub header_indicators: Vec<Regex>,
    pub implementation_indicators: Vec<Regex>,
    pub header_default: String,
    pub implementation_default: String,
}

impl RuleSet {
    pub fn builtin() -> &'static RuleSet {
        static RULES: OnceLock<RuleSet> = OnceLock::new();
        RULES.get_or_init(|| RuleSet {
            signatures: BUILTIN_SIGNATURES
                .iter()
                .map(|(ident, file)| SignatureRule::for_identifier(ident, *file))
                .collect(),
            header_indicators: compile_all(HEADER_INDICATORS),
            implementation_indicators: compile_all(IMPLEMENTATION_INDICATORS),
            header_default: DEFAULT_HEADER_FILE.to_string(),
            implementation_default: DEFAULT_IMPLEMENTATION_FILE.to_string(),
        })
    }

    /// Copy of the built-in set with `extra` rules evaluated ahead of the built-in ones.
    pub fn extended(extra: Vec<SignatureRule>) -> RuleSet {
        let builtin = Self::builtin();
        let mut signatures = extra;
        signatures.extend(builtin.signatures.iter().cloned());
        RuleSet {
            signatures,
            ..builtin.clone()
        }
    }
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}
