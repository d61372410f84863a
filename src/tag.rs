//! Memory tag enumeration (spec §3.5), shared by the arena, the allocator
//! trait's statistics, and anything else that buckets bytes by purpose.

/// A bucket used to categorize allocation bytes in statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemoryTag {
    Unknown = 0,
    Array,
    String,
    Vector,
    Queue,
    Struct,
    Buffer,
    Renderer,
    File,
    Texture,
    HashTable,
    Freelist,
    Vulkan,
    Gpu,
    /// Sentinel marking the number of real tags; never used to tag bytes.
    Max,
}

impl MemoryTag {
    pub const COUNT: usize = MemoryTag::Max as usize;

    pub const ALL: [MemoryTag; MemoryTag::COUNT] = [
        MemoryTag::Unknown,
        MemoryTag::Array,
        MemoryTag::String,
        MemoryTag::Vector,
        MemoryTag::Queue,
        MemoryTag::Struct,
        MemoryTag::Buffer,
        MemoryTag::Renderer,
        MemoryTag::File,
        MemoryTag::Texture,
        MemoryTag::HashTable,
        MemoryTag::Freelist,
        MemoryTag::Vulkan,
        MemoryTag::Gpu,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            MemoryTag::Unknown => "UNKNOWN",
            MemoryTag::Array => "ARRAY",
            MemoryTag::String => "STRING",
            MemoryTag::Vector => "VECTOR",
            MemoryTag::Queue => "QUEUE",
            MemoryTag::Struct => "STRUCT",
            MemoryTag::Buffer => "BUFFER",
            MemoryTag::Renderer => "RENDERER",
            MemoryTag::File => "FILE",
            MemoryTag::Texture => "TEXTURE",
            MemoryTag::HashTable => "HASH_TABLE",
            MemoryTag::Freelist => "FREELIST",
            MemoryTag::Vulkan => "VULKAN",
            MemoryTag::Gpu => "GPU",
            MemoryTag::Max => "MAX",
        }
    }
}
